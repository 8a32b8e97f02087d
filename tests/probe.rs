//! Sample-rate probing tests.

mod common;

use std::path::Path;

use autoedit::{
    AutoEditError, CommandOutput, ProbeReport, SAMPLE_RATE_UNRESOLVED, SamplingRateResolver,
    ToolLogLevel, Toolchain,
};

use common::{Analysis, ScriptedRunner, WAV_PROBE_JSON, scripted_toolchain};

const VIDEO_FIRST_JSON: &str = r#"{
    "streams": [
        { "index": 0, "codec_name": "h264", "codec_type": "video", "width": 1920, "height": 1080 },
        { "index": 1, "codec_name": "aac", "codec_type": "audio", "sample_rate": "44100", "channels": 2 },
        { "index": 2, "codec_name": "opus", "codec_type": "audio", "sample_rate": "48000", "channels": 2 }
    ]
}"#;

fn probe_runner(output: CommandOutput) -> std::sync::Arc<ScriptedRunner> {
    ScriptedRunner::new(output, Analysis::Write(String::new()))
}

// ── ProbeReport ────────────────────────────────────────────────────

#[test]
fn parses_string_sample_rate() {
    let report = ProbeReport::parse(WAV_PROBE_JSON).expect("parse");
    assert_eq!(report.streams.len(), 1);

    let stream = &report.streams[0];
    assert_eq!(stream.sample_rate, Some(48_000));
    assert_eq!(stream.channels, Some(2));
    assert_eq!(stream.codec_name.as_deref(), Some("pcm_s16le"));
    assert_eq!(stream.duration_ts, Some(2_880_000));
    assert!(stream.is_audio());
    assert_eq!(report.sample_rate().expect("rate"), 48_000);
}

#[test]
fn parses_numeric_sample_rate() {
    let report =
        ProbeReport::parse(r#"{"streams":[{"index":0,"codec_type":"audio","sample_rate":22050}]}"#)
            .expect("parse");
    assert_eq!(report.sample_rate().expect("rate"), 22_050);
}

#[test]
fn skips_video_streams() {
    let report = ProbeReport::parse(VIDEO_FIRST_JSON).expect("parse");
    assert_eq!(report.streams.len(), 3);
    assert!(!report.streams[0].is_audio());
    assert_eq!(report.streams[0].sample_rate, None);

    let first_audio = report.first_audio_stream().expect("audio stream");
    assert_eq!(first_audio.index, 1);
    assert_eq!(report.sample_rate().expect("rate"), 44_100);
}

#[test]
fn stream_without_codec_type_counts_as_audio_when_it_has_a_rate() {
    let report = ProbeReport::parse(r#"{"streams":[{"index":0},{"index":1,"sample_rate":"8000"}]}"#)
        .expect("parse");
    assert_eq!(report.sample_rate().expect("rate"), 8_000);
}

#[test]
fn unparseable_sample_rate_is_treated_as_missing() {
    let report = ProbeReport::parse(
        r#"{"streams":[{"index":0,"codec_type":"audio","sample_rate":"N/A"}]}"#,
    )
    .expect("parse");
    assert_eq!(report.streams[0].sample_rate, None);
    assert!(matches!(report.sample_rate(), Err(AutoEditError::NoAudioStream)));
}

#[test]
fn empty_reports_have_no_audio() {
    for json in ["", "   \n", "{}", r#"{"streams":[]}"#] {
        let report = ProbeReport::parse(json).expect("parse");
        assert!(report.streams.is_empty());
        assert!(matches!(report.sample_rate(), Err(AutoEditError::NoAudioStream)));
    }
}

#[test]
fn invalid_json_is_probe_output_error() {
    let result = ProbeReport::parse("{ not json");
    assert!(matches!(result, Err(AutoEditError::ProbeOutput(_))));
}

#[test]
fn stream_display_is_readable() {
    let report = ProbeReport::parse(WAV_PROBE_JSON).expect("parse");
    let text = report.streams[0].to_string();
    assert_eq!(text, "#0 audio (pcm_s16le) 48000 Hz 2 ch");
}

// ── SamplingRateResolver ───────────────────────────────────────────

#[test]
fn probe_invocation_requests_json_streams() {
    let resolver = SamplingRateResolver::new(
        Toolchain::unchecked("ffmpeg", "ffprobe").with_log_level(ToolLogLevel::Quiet),
    );
    let invocation = resolver.probe_invocation(Path::new("input.wav"));

    assert_eq!(invocation.program, Path::new("ffprobe"));
    let args: Vec<String> = invocation
        .args
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        args,
        ["-v", "quiet", "-show_streams", "-of", "json", "input.wav"]
    );
}

#[test]
fn resolves_rate_from_successful_probe() {
    let runner = probe_runner(CommandOutput::success(VIDEO_FIRST_JSON));
    let resolver = SamplingRateResolver::with_runner(scripted_toolchain(), runner.clone());

    assert_eq!(resolver.sample_rate("input.mp4").expect("rate"), 44_100);
    assert_eq!(resolver.resolve_sampling_rate("input.mp4"), 44_100);
    assert_eq!(runner.calls().len(), 2);
}

#[test]
fn failed_probe_returns_sentinel() {
    let runner = probe_runner(CommandOutput::failure(1, "input.wav: No such file or directory"));
    let resolver = SamplingRateResolver::with_runner(scripted_toolchain(), runner);

    assert_eq!(resolver.resolve_sampling_rate("input.wav"), SAMPLE_RATE_UNRESOLVED);
    assert_eq!(SAMPLE_RATE_UNRESOLVED, -1);
}

#[test]
fn tagged_result_distinguishes_failure_kinds() {
    let crashed = SamplingRateResolver::with_runner(
        scripted_toolchain(),
        probe_runner(CommandOutput::failure(1, "boom")),
    );
    match crashed.sample_rate("input.wav") {
        Err(AutoEditError::ProcessFailed { program, stderr, .. }) => {
            assert_eq!(program, "ffprobe");
            assert_eq!(stderr, "boom");
        }
        other => panic!("Expected ProcessFailed, got: {other:?}"),
    }

    let silent = SamplingRateResolver::with_runner(
        scripted_toolchain(),
        probe_runner(CommandOutput::success(r#"{"streams":[{"index":0,"codec_type":"video"}]}"#)),
    );
    assert!(matches!(
        silent.sample_rate("input.mp4"),
        Err(AutoEditError::NoAudioStream)
    ));
    assert_eq!(silent.resolve_sampling_rate("input.mp4"), SAMPLE_RATE_UNRESOLVED);
}

#[test]
fn garbage_probe_output_returns_sentinel() {
    let runner = probe_runner(CommandOutput::success("ffprobe version 6.0"));
    let resolver = SamplingRateResolver::with_runner(scripted_toolchain(), runner);

    assert!(matches!(
        resolver.sample_rate("input.wav"),
        Err(AutoEditError::ProbeOutput(_))
    ));
    assert_eq!(resolver.resolve_sampling_rate("input.wav"), SAMPLE_RATE_UNRESOLVED);
}

#[test]
fn missing_probe_executable_returns_sentinel() {
    let resolver = SamplingRateResolver::new(Toolchain::unchecked(
        "/nonexistent/autoedit/ffmpeg",
        "/nonexistent/autoedit/ffprobe",
    ));

    assert!(matches!(
        resolver.sample_rate("input.wav"),
        Err(AutoEditError::ProcessLaunch { .. })
    ));
    assert_eq!(resolver.resolve_sampling_rate("input.wav"), SAMPLE_RATE_UNRESOLVED);
}

#[test]
fn real_ffprobe_on_fixture() {
    let path = "tests/fixtures/sample_audio.wav";
    if !Path::new(path).exists() {
        return;
    }

    let resolver = SamplingRateResolver::new(Toolchain::from_env());
    let rate = resolver.resolve_sampling_rate(path);
    assert!(rate > 0, "fixture should have an audio stream, got {rate}");
}

#[test]
fn zero_sample_rate_is_unresolved() {
    let report =
        ProbeReport::parse(r#"{"streams":[{"index":0,"codec_type":"audio","sample_rate":"0"}]}"#)
            .expect("parse");
    assert!(matches!(report.sample_rate(), Err(AutoEditError::NoAudioStream)));
}
