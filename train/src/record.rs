//! Per-image record files.

use crate::common::*;

/// The boxes of one image. Features are stored separately under the name
/// of the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub name: String,
    /// `[height, width]` of the image.
    pub image_size: [f32; 2],
    /// `[height, width]` of the network input the proposals refer to.
    #[serde(default)]
    pub input_size: Option<[f32; 2]>,
    pub labels: Vec<RecordLabel>,
    /// Proposal boxes in `[x1, y1, x2, y2]` order.
    pub proposals: Vec<[f32; 4]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordLabel {
    /// `[x1, y1, x2, y2]`
    pub bbox: [f32; 4],
    /// 1-based class id.
    pub class: usize,
}

impl ImageRecord {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let record = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse record {}", path.display()))?;
        Ok(record)
    }

    pub fn to_sample(&self, num_classes: usize) -> Result<ImageSample> {
        let image_size = HW::try_from_hw(self.image_size)?;
        let input_size = self.input_size.map(HW::try_from_hw).transpose()?;
        let labels: Vec<_> = self
            .labels
            .iter()
            .map(|label| -> Result<_> {
                Ok(Label {
                    rect: TLBR::try_from_xyxy(label.bbox)?,
                    class: ClassId::try_checked(label.class, num_classes)?,
                })
            })
            .try_collect()?;
        let proposals: Vec<_> = self
            .proposals
            .iter()
            .map(|&xyxy| TLBR::try_from_xyxy(xyxy))
            .try_collect()?;

        Ok(ImageSample {
            image_size,
            input_size,
            labels,
            proposals,
        })
    }
}

/// Load every `*.json` record in `dir`, sorted by file name.
pub fn load_records(dir: &Path) -> Result<Vec<ImageRecord>> {
    let pattern = dir.join("*.json");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| format_err!("non-UTF-8 path {}", dir.display()))?;

    let paths: Vec<PathBuf> = glob::glob(pattern)?.try_collect()?;
    let records: Vec<_> = paths
        .into_iter()
        .sorted()
        .map(ImageRecord::open)
        .try_collect()?;
    info!("found {} records in {}", records.len(), dir.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_to_sample() {
        let record: ImageRecord = serde_json::from_str(
            r#"{
                "name": "000001",
                "image_size": [300, 400],
                "labels": [{ "bbox": [10, 20, 50, 80], "class": 3 }],
                "proposals": [[0, 0, 100, 100]]
            }"#,
        )
        .unwrap();

        let sample = record.to_sample(3).unwrap();
        assert_eq!(sample.num_boxes(), 2);
        assert_eq!(sample.labels[0].class.get(), 3);
        assert_eq!(sample.labels[0].rect.xyxy(), [10.0, 20.0, 50.0, 80.0]);
        assert!(sample.input_size.is_none());

        assert!(record.to_sample(2).is_err());
    }
}
