use std::path::Path;

use npu_classify::{
  ClassifyError, FromUrl,
  frame::{PackedFrame, pack_argb},
  input::InputWrapper,
  model::{Labels, ModelSpec, PlaneOrder, ReplayModel, TensorByteOrder},
  output::{DirectoryRecordOutput, OutputWrapper},
  pipeline::{Classify, ClassifyPipeline},
  task::{LatencyAccumulator, classify_batch},
};
use url::Url;

fn write_fixture(dir: &Path, scores: &str) -> Url {
  let labels = dir.join("labels.txt");
  let scores_path = dir.join("scores.json");
  std::fs::write(&labels, "cat\ndog\nbird\ncar\n").unwrap();
  std::fs::write(&scores_path, scores).unwrap();
  Url::parse(&format!(
    "replay://{}?width=4&height=4&labels={}",
    scores_path.display(),
    labels.display()
  ))
  .unwrap()
}

fn labels() -> Labels {
  ["cat", "dog", "bird", "car"].into_iter().collect()
}

#[test]
fn classifies_folder_and_records_results() {
  let workspace = tempfile::tempdir().unwrap();
  let images = workspace.path().join("images");
  let records = workspace.path().join("records");
  std::fs::create_dir_all(&images).unwrap();
  for (name, color) in [("1.png", [200, 10, 10]), ("2.png", [10, 200, 10]), ("3.png", [10, 10, 200])] {
    image::RgbImage::from_pixel(16, 12, image::Rgb(color))
      .save(images.join(name))
      .unwrap();
  }

  let model_url = write_fixture(
    workspace.path(),
    "[[0.9, 0.05, 0.03, 0.02], null, [0.1, 0.2, 0.6, 0.1]]",
  );
  let pipeline = ClassifyPipeline::<ReplayModel>::from_url(&model_url).unwrap();

  let input_url = Url::parse(&format!("folder://{}", images.display())).unwrap();
  let frames = InputWrapper::from_url(&input_url).unwrap().into_frames(4, 4);
  let output_url = Url::parse(&format!("folder://{}?always", records.display())).unwrap();
  let output = OutputWrapper::from_url(&output_url).unwrap();

  let acc = classify_batch(frames, &pipeline, &output, LatencyAccumulator::default(), None).unwrap();
  assert_eq!(acc.count(), 2);
  assert_eq!(acc.failures(), 1);
  assert!(acc.average().is_some());

  let mut written = 0;
  let mut stack = vec![records];
  while let Some(dir) = stack.pop() {
    for entry in std::fs::read_dir(dir).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        stack.push(path);
      } else {
        written += 1;
      }
    }
  }
  assert_eq!(written, 3);
}

#[test]
fn ranks_top_three_with_stable_ties() {
  let workspace = tempfile::tempdir().unwrap();
  let model_url = write_fixture(workspace.path(), "[[0.9, 0.05, 0.03, 0.02], [0.5, 0.5, 0.1]]");
  let pipeline = ClassifyPipeline::<ReplayModel>::from_url(&model_url).unwrap();
  let frame = PackedFrame::solid(4, 4, 128, 64, 32);

  let first = pipeline.classify(&frame).unwrap();
  let ranked: Vec<(&str, f32)> = first.entries().map(|e| (e.label.as_str(), e.score)).collect();
  assert_eq!(ranked, vec![("cat", 0.9), ("dog", 0.05), ("bird", 0.03)]);
  assert_eq!(first.headline(), "cat - 90.00%");
  assert_eq!(first.runners_up(), "dog - 5.00%\nbird - 3.00%\n");
  assert!(first.latency_line().starts_with("inference time: "));

  let second = pipeline.classify(&frame).unwrap();
  assert_eq!(second.get(0).map(|e| e.class_id), Some(0));
  assert_eq!(second.get(1).map(|e| e.class_id), Some(1));
  assert_eq!(second.get(2).map(|e| e.label.as_str()), Some("bird"));
}

#[test]
fn encodes_planes_in_configured_order() {
  let frame = PackedFrame::solid(4, 4, 128, 64, 32);
  let model = || ReplayModel::new(vec![vec![0.4, 0.3, 0.2, 0.1].into()]);

  let spec = ModelSpec::new(4, 4, labels());
  let pipeline = ClassifyPipeline::new(spec, model()).unwrap();
  let tensor = pipeline.encode(&frame).unwrap();
  assert_eq!(tensor.len(), 4 * 4 * 3 * 4);
  let floats = tensor.to_f32_vec(TensorByteOrder::Little);
  assert!(floats[..16].iter().all(|&v| (v - 128.0 / 255.0).abs() < 1e-6));
  assert!(floats[16..32].iter().all(|&v| (v - 64.0 / 255.0).abs() < 1e-6));
  assert!(floats[32..].iter().all(|&v| (v - 32.0 / 255.0).abs() < 1e-6));
  assert_eq!(tensor, pipeline.encode(&frame).unwrap());

  let spec = ModelSpec::new(4, 4, labels())
    .plane_order(PlaneOrder::Rbg)
    .byte_order(TensorByteOrder::Big);
  let pipeline = ClassifyPipeline::new(spec, model()).unwrap();
  let floats = pipeline.encode(&frame).unwrap().to_f32_vec(TensorByteOrder::Big);
  assert!((floats[16] - 32.0 / 255.0).abs() < 1e-6);
  assert!((floats[32] - 64.0 / 255.0).abs() < 1e-6);
}

#[test]
fn reads_pixels_linearly_from_larger_images() {
  let frame = PackedFrame::from_fn(4, 2, |x, y| pack_argb(0xFF, (y * 4 + x) as u8, 0, 0));
  let spec = ModelSpec::new(2, 2, labels());
  let pipeline = ClassifyPipeline::new(spec, ReplayModel::new(vec![vec![1.0].into()])).unwrap();

  let floats = pipeline.encode(&frame).unwrap().to_f32_vec(TensorByteOrder::Little);
  let reds: Vec<f32> = floats[..4].iter().map(|v| (v * 255.0).round()).collect();
  assert_eq!(reds, vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn small_images_are_rejected_before_inference() {
  let spec = ModelSpec::new(4, 4, labels());
  let pipeline = ClassifyPipeline::new(spec, ReplayModel::new(vec![vec![1.0].into()])).unwrap();
  let err = pipeline.classify(&PackedFrame::solid(2, 2, 0, 0, 0)).unwrap_err();
  assert!(matches!(
    err,
    ClassifyError::OutOfBoundsRead {
      required: 16,
      available: 4
    }
  ));
}

#[test]
fn scheme_dispatch_rejects_unknown_outputs() {
  let url = Url::parse("rtsp://127.0.0.1/live").unwrap();
  assert!(OutputWrapper::from_url(&url).is_err());
  let url = Url::parse("log:").unwrap();
  assert!(DirectoryRecordOutput::from_url(&url).is_err());
}
