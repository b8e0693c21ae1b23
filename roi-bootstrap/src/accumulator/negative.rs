use super::check_features;
use crate::{
    common::*, config::MinibootstrapConfig, config::ThresholdConfig, overlap::OverlapMatrix,
    sample::BoxSet,
};

/// Fixed-capacity negative mini-batches indexed by class and batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegativePool {
    num_classes: usize,
    iterations: usize,
    batch_size: usize,
    feature_dim: usize,
    batches: Vec<Vec<f32>>,
}

impl NegativePool {
    pub fn new(num_classes: usize, iterations: usize, batch_size: usize, feature_dim: usize) -> Self {
        let batches = (0..num_classes * iterations)
            .map(|_| Vec::with_capacity(batch_size * feature_dim))
            .collect();
        Self {
            num_classes,
            iterations,
            batch_size,
            feature_dim,
            batches,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    fn slot(&self, class: ClassId, batch: usize) -> usize {
        assert!(
            class.index() < self.num_classes && batch < self.iterations,
            "batch ({}, {}) is out of range",
            class,
            batch
        );
        class.index() * self.iterations + batch
    }

    /// The number of rows in a batch.
    pub fn batch_len(&self, class: ClassId, batch: usize) -> usize {
        self.batches[self.slot(class, batch)].len() / self.feature_dim
    }

    pub fn is_batch_full(&self, class: ClassId, batch: usize) -> bool {
        self.batch_len(class, batch) >= self.batch_size
    }

    pub fn batch(&self, class: ClassId, batch: usize) -> ArrayView2<'_, f32> {
        let buffer: &[f32] = &self.batches[self.slot(class, batch)];
        ArrayView2::from_shape((buffer.len() / self.feature_dim, self.feature_dim), buffer)
            .unwrap()
    }

    pub fn batches(&self, class: ClassId) -> impl Iterator<Item = ArrayView2<'_, f32>> {
        (0..self.iterations).map(move |batch| self.batch(class, batch))
    }

    /// The number of rows of `class` over all batches.
    pub fn class_len(&self, class: ClassId) -> usize {
        (0..self.iterations)
            .map(|batch| self.batch_len(class, batch))
            .sum()
    }

    /// All rows of `class`, batch after batch.
    pub fn class_features(&self, class: ClassId) -> Array2<f32> {
        let rows: Vec<_> = self.batches(class).collect();
        ndarray::concatenate(Axis(0), &rows)
            .unwrap_or_else(|_| Array2::zeros((0, self.feature_dim)))
    }

    pub(crate) fn push(&mut self, class: ClassId, batch: usize, feature: ArrayView1<'_, f32>) {
        debug_assert!(!self.is_batch_full(class, batch));
        let slot = self.slot(class, batch);
        self.batches[slot].extend(feature.iter());
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.feature_dim > 0, "feature_dim must be positive");
        ensure!(
            self.batches.len() == self.num_classes * self.iterations,
            "expect {} negative batches, but get {}",
            self.num_classes * self.iterations,
            self.batches.len()
        );
        for buffer in &self.batches {
            ensure!(
                buffer.len() % self.feature_dim == 0,
                "negative batch is not a whole number of rows"
            );
            ensure!(
                buffer.len() / self.feature_dim <= self.batch_size,
                "negative batch holds more than {} rows",
                self.batch_size
            );
        }
        Ok(())
    }
}

/// What a single image added to the negative side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegativeUpdate {
    /// Rows stored over all classes.
    pub added: usize,
    /// Classes that became complete on this image.
    pub completed: Vec<ClassId>,
}

/// Fills `iterations` negative mini-batches per class, image by image.
///
/// A class draws easy negatives from images without any of its ground
/// truths and hard negatives, boxes overlapping its ground truths less than
/// the negative threshold, from images with them. Each image splits its
/// draws over the open batches, at most `ceil(negatives_per_batch /
/// iterations)` rows per batch. The class stops collecting once every batch
/// is full.
#[derive(Debug, Clone)]
pub struct NegativeMiningAccumulator {
    negative_overlap: f32,
    negatives_per_batch: usize,
    current_batch: Vec<usize>,
    incomplete: IndexSet<usize>,
    pool: NegativePool,
}

impl NegativeMiningAccumulator {
    pub fn new(config: &MinibootstrapConfig, thresholds: &ThresholdConfig) -> Self {
        let num_classes = config.num_classes.get();
        Self {
            negative_overlap: thresholds.negative_overlap.raw() as f32,
            negatives_per_batch: config.negatives_per_batch.get(),
            current_batch: vec![0; num_classes],
            incomplete: (0..num_classes).collect(),
            pool: NegativePool::new(
                num_classes,
                config.iterations.get(),
                config.batch_size.get(),
                config.feature_dim.get(),
            ),
        }
    }

    pub fn accumulate<R>(
        &mut self,
        boxes: &BoxSet,
        overlaps: &OverlapMatrix,
        features: ArrayView2<'_, f32>,
        rng: &mut R,
    ) -> Result<NegativeUpdate>
    where
        R: Rng + ?Sized,
    {
        check_features(features, boxes.len(), self.pool.feature_dim())?;
        ensure!(
            overlaps.num_boxes() == boxes.len(),
            "overlap matrix has {} rows for {} boxes",
            overlaps.num_boxes(),
            boxes.len()
        );

        let mut update = NegativeUpdate::default();
        if boxes.is_empty() {
            return Ok(update);
        }

        let iterations = self.pool.iterations();
        let share = (self.negatives_per_batch + iterations - 1) / iterations;
        let pending: Vec<usize> = self.incomplete.iter().cloned().collect();
        for index in pending {
            let class = ClassId::from_index(index);

            let candidates: Vec<usize> = if boxes.has_class(class) {
                overlaps
                    .class_column(class)
                    .iter()
                    .positions(|&overlap| overlap < self.negative_overlap)
                    .collect()
            } else {
                (0..boxes.len()).collect()
            };

            if candidates.is_empty() {
                debug!("no hard negative for class {} in this image", class);
                continue;
            }

            let picks: Vec<usize> = (0..self.negatives_per_batch)
                .map(|_| candidates[rng.gen_range(0..candidates.len())])
                .collect();

            let mut picks = picks.into_iter();
            for batch in self.current_batch[index]..iterations {
                let room = self.pool.batch_size() - self.pool.batch_len(class, batch);
                for row in picks.by_ref().take(share.min(room)) {
                    self.pool.push(class, batch, features.row(row));
                    update.added += 1;
                }
                if picks.len() == 0 {
                    break;
                }
            }

            while self.current_batch[index] < iterations
                && self.pool.is_batch_full(class, self.current_batch[index])
            {
                self.current_batch[index] += 1;
            }

            if self.current_batch[index] == iterations {
                self.incomplete.shift_remove(&index);
                update.completed.push(class);
                info!(
                    "class {} collected all {} negative batches",
                    class, iterations
                );
            }
        }

        Ok(update)
    }

    pub fn is_complete(&self, class: ClassId) -> bool {
        !self.incomplete.contains(&class.index())
    }

    pub fn all_complete(&self) -> bool {
        self.incomplete.is_empty()
    }

    /// Incomplete classes in ascending order.
    pub fn incomplete_classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.incomplete.iter().map(|&index| ClassId::from_index(index))
    }

    /// The batch the next negative of `class` goes into.
    pub fn current_batch(&self, class: ClassId) -> usize {
        self.current_batch[class.index()]
    }

    pub fn pool(&self) -> &NegativePool {
        &self.pool
    }

    pub fn into_pool(self) -> NegativePool {
        self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(id: usize) -> ClassId {
        ClassId::new(id).unwrap()
    }

    fn config(iterations: usize, batch_size: usize, negatives_per_batch: usize) -> MinibootstrapConfig {
        MinibootstrapConfig {
            num_classes: NonZeroUsize::new(2).unwrap(),
            iterations: NonZeroUsize::new(iterations).unwrap(),
            batch_size: NonZeroUsize::new(batch_size).unwrap(),
            negatives_per_batch: NonZeroUsize::new(negatives_per_batch).unwrap(),
            feature_dim: NonZeroUsize::new(1).unwrap(),
        }
    }

    fn image(with_gt: bool) -> (BoxSet, OverlapMatrix, Array2<f32>) {
        let mut boxes = vec![
            TLBR::from_xyxy([0.0, 0.0, 10.0, 10.0]),
            TLBR::from_xyxy([1.0, 1.0, 10.0, 10.0]),
            TLBR::from_xyxy([60.0, 60.0, 90.0, 90.0]),
        ];
        let gt_classes = if with_gt {
            vec![class(1)]
        } else {
            boxes.remove(0);
            vec![]
        };
        let boxes = BoxSet {
            image_size: HW::from_hw([100.0, 100.0]),
            boxes,
            gt_classes,
        };
        let overlaps = OverlapMatrix::compute(CoordFormat::ZeroBased, &boxes, 2).unwrap();
        let features = Array2::from_shape_fn((boxes.len(), 1), |(row, _)| row as f32);
        (boxes, overlaps, features)
    }

    #[test]
    fn split_across_open_batches() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut accumulator =
            NegativeMiningAccumulator::new(&config(2, 10, 4), &Default::default());
        let (boxes, overlaps, features) = image(false);

        let update = accumulator
            .accumulate(&boxes, &overlaps, features.view(), &mut rng)
            .unwrap();
        assert_eq!(update.added, 8);
        assert!(update.completed.is_empty());

        let pool = accumulator.pool();
        for class in [class(1), class(2)] {
            assert_eq!(pool.batch_len(class, 0), 2);
            assert_eq!(pool.batch_len(class, 1), 2);
        }
        assert_eq!(accumulator.current_batch(class(1)), 0);
    }

    #[test]
    fn share_bounded_by_remaining_room() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut accumulator = NegativeMiningAccumulator::new(&config(3, 2, 5), &Default::default());
        let (boxes, overlaps, features) = image(false);

        // ceil(5 / 3) = 2 rows per batch, the last batch gets the remainder
        accumulator
            .accumulate(&boxes, &overlaps, features.view(), &mut rng)
            .unwrap();
        let pool = accumulator.pool();
        assert_eq!(pool.batch_len(class(1), 0), 2);
        assert_eq!(pool.batch_len(class(1), 1), 2);
        assert_eq!(pool.batch_len(class(1), 2), 1);
        assert_eq!(accumulator.current_batch(class(1)), 2);

        // only one row of room is left
        let update = accumulator
            .accumulate(&boxes, &overlaps, features.view(), &mut rng)
            .unwrap();
        assert_eq!(update.added, 2);
        assert_eq!(update.completed, vec![class(1), class(2)]);
        assert_eq!(accumulator.pool().class_len(class(1)), 6);
    }

    #[test]
    fn hard_negatives_stay_below_threshold() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut accumulator = NegativeMiningAccumulator::new(&config(4, 5, 5), &Default::default());
        let (boxes, overlaps, features) = image(true);

        accumulator
            .accumulate(&boxes, &overlaps, features.view(), &mut rng)
            .unwrap();

        // only the far box overlaps the ground truth below 0.3
        let rows = accumulator.pool().class_features(class(1));
        assert_eq!(rows.nrows(), 5);
        assert!(rows.iter().all(|&value| value == 2.0));
        assert_eq!(accumulator.pool().class_len(class(2)), 5);
    }

    #[test]
    fn complete_classes_stop_collecting() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = config(2, 3, 4);
        let mut accumulator = NegativeMiningAccumulator::new(&config, &Default::default());
        let (boxes, overlaps, features) = image(false);

        let first = accumulator
            .accumulate(&boxes, &overlaps, features.view(), &mut rng)
            .unwrap();
        assert!(first.completed.is_empty());

        let second = accumulator
            .accumulate(&boxes, &overlaps, features.view(), &mut rng)
            .unwrap();
        assert_eq!(second.added, 4);
        assert_eq!(second.completed, vec![class(1), class(2)]);
        assert!(accumulator.all_complete());

        let third = accumulator
            .accumulate(&boxes, &overlaps, features.view(), &mut rng)
            .unwrap();
        assert_eq!(third, NegativeUpdate::default());

        for class in [class(1), class(2)] {
            assert!(accumulator.is_complete(class));
            assert_eq!(
                accumulator.pool().class_len(class),
                config.negative_capacity()
            );
            assert!(accumulator
                .pool()
                .batches(class)
                .all(|batch| batch.nrows() == 3));
        }
    }
}
