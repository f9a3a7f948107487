use super::*;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "holdframe_{name}_{}_{}.wav",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn f32_bytes_split_across_writes_round_trip() {
    let path = temp_path("wav_f32");
    let mut w = WavByteWriter::create(&path, AudioFormat::default()).unwrap();
    let samples = [0.25f32, -0.5, 1.0];
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    // Split mid-sample.
    w.write_bytes(&bytes[..5]).unwrap();
    assert_eq!(w.samples_written(), 1);
    w.write_bytes(&bytes[5..]).unwrap();
    assert_eq!(w.finalize().unwrap(), 3);

    let mut reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 16_000);
    assert_eq!(reader.spec().channels, 1);
    let read: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    assert_eq!(read, samples);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn i16_partial_tail_is_dropped() {
    let path = temp_path("wav_i16");
    let format = AudioFormat {
        sample_rate: 8_000,
        channels: 2,
        sample_format: SampleFormat::I16,
    };
    let mut w = WavByteWriter::create(&path, format).unwrap();
    w.write_bytes(&[1, 0, 2, 0, 9]).unwrap();
    assert_eq!(w.finalize().unwrap(), 2);

    let mut reader = hound::WavReader::open(&path).unwrap();
    let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read, vec![1, 2]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn invalid_format_is_rejected() {
    let path = temp_path("wav_invalid");
    let format = AudioFormat {
        channels: 0,
        ..AudioFormat::default()
    };
    assert!(matches!(
        WavByteWriter::create(&path, format),
        Err(HoldframeError::Validation(_))
    ));
}
