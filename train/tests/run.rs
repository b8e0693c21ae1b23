use std::{fs, path::Path};
use train::config::Config;

fn write_dataset(dir: &Path) {
    let records_dir = dir.join("records");
    let features_dir = dir.join("features");
    fs::create_dir_all(&records_dir).unwrap();
    fs::create_dir_all(&features_dir).unwrap();

    for index in 0..3 {
        let name = format!("{:06}", index);
        let offset = index as f32 * 10.0;
        let record = serde_json::json!({
            "name": name,
            "image_size": [120.0, 160.0],
            "labels": [{ "bbox": [20.0 + offset, 20.0, 80.0 + offset, 70.0], "class": 1 }],
            "proposals": [
                [22.0 + offset, 20.0, 80.0 + offset, 70.0],
                [100.0, 80.0, 150.0, 110.0],
                [0.0, 90.0, 30.0, 119.0],
            ],
        });
        fs::write(
            records_dir.join(format!("{}.json", name)),
            record.to_string(),
        )
        .unwrap();

        let features: Vec<Vec<f32>> = (0..4)
            .map(|row| vec![1.0 + row as f32, index as f32, 2.0])
            .collect();
        fs::write(
            features_dir.join(format!("{}.json", name)),
            serde_json::to_string(&features).unwrap(),
        )
        .unwrap();
    }
}

fn config(dir: &Path, load_dir: Option<&Path>) -> Config {
    let path = |name: &str| dir.join(name).display().to_string();
    let load_dir_entry = match load_dir {
        Some(load_dir) => format!("load_dir: {:?},", load_dir.display().to_string()),
        None => String::new(),
    };
    let text = format!(
        r#"{{
            records_dir: {records:?},
            output_dir: {output:?},
            cache_dir: {cache:?},
            {load_dir_entry}
            coord_format: "zero_based",
            seed: 1,
            feature_info: {{
                backbone: "test",
                num_epochs: 1,
                feat_task_name: "a",
                target_task_name: "b",
            }},
            run: {{
                only_online_detection: true,
                save_detector_models: true,
                load_detector_models: {load},
            }},
            roles: {{
                detector: {{
                    features_dir: {features:?},
                    features_format: "json",
                    minibootstrap: {{
                        num_classes: 2,
                        iterations: 1,
                        batch_size: 2,
                        negatives_per_batch: 2,
                        feature_dim: 3,
                    }},
                }},
            }},
        }}"#,
        records = path("records"),
        output = path("output"),
        cache = path("cache"),
        features = path("features"),
        load_dir_entry = load_dir_entry,
        load = load_dir.is_some(),
    );
    json5::from_str(&text).unwrap()
}

#[test]
fn accumulate_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());

    let run_dir = train::start(&config(dir.path(), None)).unwrap();
    assert!(run_dir.join("config.json5").is_file());
    assert!(run_dir.join("stats_detector.json").is_file());
    for name in ["positives", "negatives", "regression"] {
        assert!(run_dir
            .join("features_detector")
            .join(format!("{}.json", name))
            .is_file());
    }
    assert!(dir
        .path()
        .join("cache/feat_cache/test%5Fep1%5FFTa%5FTTb/stats")
        .is_file());

    let second_dir = train::start(&config(dir.path(), Some(run_dir.as_path()))).unwrap();
    assert!(second_dir.join("stats_detector.json").is_file());
}
