use super::BoxRegressionCodec;
use crate::common::*;

/// A trained per-class box regressor.
///
/// `beta` holds one row per target coordinate `(dx, dy, dw, dh)`; each row
/// is `feature_dim` coefficients followed by the bias. Raw outputs are mapped
/// back to target space by `y * t_inv + mu`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    pub class: ClassId,
    pub beta: Array2<f32>,
    pub t_inv: Array2<f32>,
    pub mu: Array1<f32>,
}

impl RegressionModel {
    pub fn new(
        class: ClassId,
        beta: Array2<f32>,
        t_inv: Array2<f32>,
        mu: Array1<f32>,
    ) -> Result<Self> {
        let model = Self {
            class,
            beta,
            t_inv,
            mu,
        };
        model.validate()?;
        Ok(model)
    }

    /// The model that passes 4-d feature rows through as target offsets.
    pub fn identity(class: ClassId) -> Self {
        let mut beta = Array2::zeros((4, 5));
        beta.slice_mut(s![.., ..4]).assign(&Array2::eye(4));
        Self {
            class,
            beta,
            t_inv: Array2::eye(4),
            mu: Array1::zeros(4),
        }
    }

    pub fn feature_dim(&self) -> usize {
        self.beta.ncols() - 1
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.beta.nrows() == 4 && self.beta.ncols() >= 2,
            "beta must have 4 rows and at least 2 columns, but get shape {:?}",
            self.beta.shape()
        );
        ensure!(
            self.t_inv.shape() == [4, 4],
            "t_inv must be 4x4, but get shape {:?}",
            self.t_inv.shape()
        );
        ensure!(
            self.mu.len() == 4,
            "mu must have 4 entries, but get {}",
            self.mu.len()
        );
        Ok(())
    }

    /// Target offsets predicted for each feature row.
    pub fn deltas(&self, features: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        let feature_dim = self.feature_dim();
        ensure!(
            features.ncols() == feature_dim,
            "expect features of dimension {}, but get {}",
            feature_dim,
            features.ncols()
        );

        let weights = self.beta.slice(s![.., ..feature_dim]);
        let bias = self.beta.column(feature_dim);
        let raw = features.dot(&weights.t()) + &bias;
        Ok(raw.dot(&self.t_inv) + &self.mu)
    }

    /// Refine each candidate box with its feature row.
    pub fn refine(
        &self,
        codec: &BoxRegressionCodec,
        features: ArrayView2<'_, f32>,
        candidates: &[TLBR<f32>],
        image_size: &HW<f32>,
    ) -> Result<Vec<TLBR<f32>>> {
        ensure!(
            features.nrows() == candidates.len(),
            "{} feature rows for {} candidate boxes",
            features.nrows(),
            candidates.len()
        );

        let deltas = self.deltas(features)?;
        deltas
            .outer_iter()
            .zip(candidates)
            .map(|(row, candidate)| {
                let deltas = [row[0], row[1], row[2], row[3]];
                codec.decode(candidate, deltas, image_size)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use itertools::izip;
    use ndarray::array;

    #[test]
    fn identity_round_trip() {
        let codec = BoxRegressionCodec::new(CoordFormat::OneBased);
        let size = HW::from_hw([480.0, 640.0]);
        let model = RegressionModel::identity(ClassId::new(1).unwrap());
        let candidates = vec![
            TLBR::from_xyxy([100.0, 120.0, 220.0, 260.0]),
            TLBR::from_xyxy([5.0, 7.0, 60.0, 40.0]),
        ];
        let gts = vec![
            TLBR::from_xyxy([90.0, 110.0, 240.0, 250.0]),
            TLBR::from_xyxy([8.0, 3.0, 58.0, 49.0]),
        ];

        let features: Array2<f32> = Array2::from_shape_vec(
            (2, 4),
            izip!(&candidates, &gts)
                .flat_map(|(candidate, gt)| codec.encode(candidate, gt))
                .collect(),
        )
        .unwrap();

        let refined = model
            .refine(&codec, features.view(), &candidates, &size)
            .unwrap();
        izip!(&refined, &gts).for_each(|(refined, gt)| {
            izip!(refined.xyxy(), gt.xyxy()).for_each(|(lhs, rhs)| {
                assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-3);
            });
        });
    }

    #[test]
    fn affine_deltas() {
        let model = RegressionModel::new(
            ClassId::new(1).unwrap(),
            array![
                [1.0, 0.0, 0.5],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0],
                [1.0, 1.0, 0.0]
            ],
            Array2::eye(4) * 2.0,
            array![0.0, 0.0, 0.1, 0.0],
        )
        .unwrap();

        let deltas = model.deltas(array![[1.0f32, 2.0]].view()).unwrap();
        assert_eq!(deltas.row(0).to_vec(), vec![3.0, 4.0, 0.1, 6.0]);
    }

    #[test]
    fn refined_boxes_stay_ordered_and_inside() {
        let mut rng = StdRng::seed_from_u64(7);
        let size = HW::from_hw([240.0, 320.0]);
        let feature_dim = 6;

        let model = RegressionModel::new(
            ClassId::new(1).unwrap(),
            Array2::from_shape_fn((4, feature_dim + 1), |_| rng.gen_range(-2.0..2.0)),
            Array2::from_shape_fn((4, 4), |_| rng.gen_range(-1.0..1.0)),
            Array1::from_shape_fn(4, |_| rng.gen_range(-0.5..0.5)),
        )
        .unwrap();

        let extremes: [f32; 6] = [
            1e30,
            -1e30,
            f32::MAX,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::NAN,
        ];
        let num_rows = 200;
        let features: Array2<f32> = Array2::from_shape_fn((num_rows, feature_dim), |(row, _)| {
            if row % 4 == 0 {
                extremes[rng.gen_range(0..extremes.len())]
            } else {
                rng.gen_range(-50.0..50.0)
            }
        });
        let candidates: Vec<_> = (0..num_rows)
            .map(|_| {
                let x1: f32 = rng.gen_range(0.0..300.0);
                let y1: f32 = rng.gen_range(0.0..220.0);
                let x2 = rng.gen_range(x1..320.0);
                let y2 = rng.gen_range(y1..240.0);
                TLBR::from_xyxy([x1, y1, x2, y2])
            })
            .collect();

        for format in [CoordFormat::ZeroBased, CoordFormat::OneBased] {
            let codec = BoxRegressionCodec::new(format);
            let ([x_min, x_max], [y_min, y_max]) = format.bounds(&size);
            let refined = model
                .refine(&codec, features.view(), &candidates, &size)
                .unwrap();

            assert_eq!(refined.len(), num_rows);
            for rect in &refined {
                let [x1, y1, x2, y2] = rect.xyxy();
                assert!(x_min <= x1 && x1 <= x2 && x2 <= x_max, "{:?}", rect);
                assert!(y_min <= y1 && y1 <= y2 && y2 <= y_max, "{:?}", rect);
            }
        }
    }

    #[test]
    fn reject_bad_shapes() {
        let class = ClassId::new(1).unwrap();
        assert!(
            RegressionModel::new(class, Array2::zeros((3, 5)), Array2::eye(4), Array1::zeros(4))
                .is_err()
        );
        assert!(
            RegressionModel::new(class, Array2::zeros((4, 5)), Array2::eye(3), Array1::zeros(4))
                .is_err()
        );

        let model = RegressionModel::identity(class);
        assert!(model.deltas(Array2::zeros((1, 3)).view()).is_err());
    }
}
