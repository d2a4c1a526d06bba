use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("finger_tracker").unwrap()
}

fn hand_json(label: &str, thumb: [f64; 3]) -> String {
    let landmarks: Vec<String> = (0..21)
        .map(|i| {
            let [x, y, z] = if i == 4 { thumb } else { [0.5, 0.5, 0.0] };
            format!(r#"{{"x":{},"y":{},"z":{}}}"#, x, y, z)
        })
        .collect();
    format!(r#"{{"handedness":"{}","landmarks":[{}]}}"#, label, landmarks.join(","))
}

fn write_frames(dir: &Path, count: usize) -> PathBuf {
    let frames = dir.join("frames");
    fs::create_dir_all(&frames).unwrap();
    for i in 0..count {
        RgbImage::from_pixel(16, 12, Rgb([40, 40, 40]))
            .save(frames.join(format!("img_{:03}.png", i)))
            .unwrap();
    }
    frames
}

fn write_detections(dir: &Path, lines: &[String]) -> PathBuf {
    let path = dir.join("detections.jsonl");
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let text = fs::read_to_string(path).unwrap();
    text.lines()
        .map(|l| l.split(',').map(str::to_string).collect())
        .collect()
}

#[test]
fn replayed_detections_produce_fixed_width_rows() {
    let tmp = TempDir::new().unwrap();
    let frames = write_frames(tmp.path(), 4);
    let detections = write_detections(
        tmp.path(),
        &[
            format!(
                r#"{{"hands":[{},{}]}}"#,
                hand_json("Right", [0.4, 0.5, 0.6]),
                hand_json("Left", [0.1, 0.2, 0.3])
            ),
            r#"{"hands":[]}"#.to_string(),
            format!(r#"{{"hands":[{}]}}"#, hand_json("Right", [0.7, 0.8, 0.9])),
            format!(
                r#"{{"hands":[{},{}]}}"#,
                hand_json("Left", [0.1, 0.1, 0.1]),
                hand_json("Left", [0.2, 0.2, 0.2])
            ),
        ],
    );
    let output = tmp.path().join("logs").join("coords.csv");

    cmd()
        .arg("--frames-dir")
        .arg(&frames)
        .arg("--detections")
        .arg(&detections)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(contains("coords.csv"));

    let rows = read_rows(&output);
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.len() == 32));
    assert_eq!(rows[0][0], "FrameNumber");
    assert_eq!(rows[0][31], "RightPinkyZ");

    assert_eq!(&rows[1][..5], &["0", "Both", "0.1", "0.2", "0.3"]);
    assert_eq!(&rows[1][17..20], &["0.4", "0.5", "0.6"]);

    assert_eq!(rows[2][1], "NoHands");
    assert!(rows[2][2..].iter().all(|f| f.is_empty()));

    assert_eq!(rows[3][1], "Right");
    assert!(rows[3][2..17].iter().all(|f| f.is_empty()));
    assert_eq!(&rows[3][17..20], &["0.7", "0.8", "0.9"]);

    assert_eq!(&rows[4][..5], &["3", "Left", "0.2", "0.2", "0.2"]);
    assert!(rows[4][17..].iter().all(|f| f.is_empty()));
}

#[test]
fn empty_input_writes_header_only() {
    let tmp = TempDir::new().unwrap();
    let frames = write_frames(tmp.path(), 0);
    let detections = write_detections(tmp.path(), &[]);
    let output = tmp.path().join("out.csv");

    cmd()
        .arg("--frames-dir")
        .arg(&frames)
        .arg("--detections")
        .arg(&detections)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let rows = read_rows(&output);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "FrameNumber");
}

#[test]
fn malformed_frames_keep_the_index_dense() {
    let tmp = TempDir::new().unwrap();
    let frames = write_frames(tmp.path(), 3);
    let detections = write_detections(
        tmp.path(),
        &[
            format!(r#"{{"hands":[{}]}}"#, hand_json("Ambidextrous", [0.1, 0.1, 0.1])),
            "this is not json".to_string(),
            format!(r#"{{"hands":[{}]}}"#, hand_json("Left", [0.3, 0.3, 0.3])),
        ],
    );
    let output = tmp.path().join("out.csv");

    cmd()
        .arg("--frames-dir")
        .arg(&frames)
        .arg("--detections")
        .arg(&detections)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let rows = read_rows(&output);
    let summary: Vec<(&str, &str)> = rows[1..]
        .iter()
        .map(|r| (r[0].as_str(), r[1].as_str()))
        .collect();
    assert_eq!(summary, vec![("0", "NoHands"), ("1", "NoHands"), ("2", "Left")]);
}

#[test]
fn undecodable_detection_line_becomes_a_no_hands_row() {
    let tmp = TempDir::new().unwrap();
    let frames = write_frames(tmp.path(), 3);
    let detections = tmp.path().join("detections.jsonl");
    let mut bytes = format!(r#"{{"hands":[{}]}}"#, hand_json("Left", [0.1, 0.2, 0.3])).into_bytes();
    bytes.extend_from_slice(b"\n\xff\xfe garbage\n");
    bytes.extend_from_slice(format!(r#"{{"hands":[{}]}}"#, hand_json("Right", [0.4, 0.5, 0.6])).as_bytes());
    bytes.push(b'\n');
    fs::write(&detections, bytes).unwrap();
    let output = tmp.path().join("out.csv");

    cmd()
        .arg("--frames-dir")
        .arg(&frames)
        .arg("--detections")
        .arg(&detections)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let rows = read_rows(&output);
    assert_eq!(rows.len(), 4);
    let summary: Vec<(&str, &str)> = rows[1..]
        .iter()
        .map(|r| (r[0].as_str(), r[1].as_str()))
        .collect();
    assert_eq!(summary, vec![("0", "Left"), ("1", "NoHands"), ("2", "Right")]);
    assert!(rows[2][2..].iter().all(|f| f.is_empty()));
}

#[test]
fn reruns_are_byte_identical() {
    let tmp = TempDir::new().unwrap();
    let frames = write_frames(tmp.path(), 2);
    let detections = write_detections(
        tmp.path(),
        &[
            format!(r#"{{"hands":[{}]}}"#, hand_json("Left", [0.123456789, 0.5, -0.01])),
            r#"{"hands":[]}"#.to_string(),
        ],
    );

    let mut outputs = Vec::new();
    for name in ["a.csv", "b.csv"] {
        let output = tmp.path().join(name);
        cmd()
            .arg("--frames-dir")
            .arg(&frames)
            .arg("--detections")
            .arg(&detections)
            .arg("--output")
            .arg(&output)
            .assert()
            .success();
        outputs.push(fs::read(&output).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn missing_input_is_rejected() {
    cmd().arg("--output").arg("x.csv").assert().failure();
}

#[test]
fn missing_video_fails_cleanly() {
    let tmp = TempDir::new().unwrap();
    let detections = write_detections(tmp.path(), &[]);
    cmd()
        .arg("--video")
        .arg(tmp.path().join("nope.mov"))
        .arg("--detections")
        .arg(&detections)
        .arg("--output")
        .arg(tmp.path().join("out.csv"))
        .assert()
        .failure()
        .stderr(contains("does not exist"));
}
