use std::ffi::OsString;
use std::path::Path;

/// Fixed ffmpeg argument block for the transform invocation.
///
/// Pure data: changing the encode means editing [`DEFAULT_POLICY`], the
/// pipeline only splices in the input, duration and output.
#[derive(Debug, Clone, Copy)]
pub struct TransformPolicy {
    /// Flags placed before `-i`
    pub global: &'static [&'static str],
    /// Joined with `,` into the `-vf` chain
    pub video_filters: &'static [&'static str],
    pub video_codec: &'static [&'static str],
    pub audio_codec: &'static [&'static str],
    /// Joined with `,` into the `-af` chain
    pub audio_filters: &'static [&'static str],
    pub container: &'static [&'static str],
    pub strip_metadata: &'static [&'static str],
}

pub const DEFAULT_POLICY: TransformPolicy = TransformPolicy {
    global: &[
        "-y",
        "-loglevel",
        "info",
        "-hide_banner",
        "-fflags",
        "+genpts",
        "-r",
        "30",
        "-vsync",
        "vfr",
    ],
    video_filters: &[
        "eq=contrast=1.02:brightness=0.02:saturation=1.04",
        "noise=alls=5:allf=t",
        "gblur=sigma=0.4",
        r"drawtext=text='\ \ ':fontsize=30:fontcolor=white@0.02:x=rand(0\,w-50):y=rand(0\,h-50)",
    ],
    video_codec: &[
        "-c:v",
        "libx264",
        "-profile:v",
        "high",
        "-preset",
        "ultrafast",
        "-crf",
        "27",
        "-b:v",
        "1200k",
        "-pix_fmt",
        "yuv420p",
    ],
    audio_codec: &["-c:a", "aac", "-b:a", "128k"],
    audio_filters: &["rubberband=pitch=1.015", "volume=1.03"],
    container: &["-strict", "-2", "-shortest", "-movflags", "+faststart"],
    strip_metadata: &[
        "-map_metadata",
        "-1",
        "-map_chapters",
        "-1",
        "-metadata",
        "title=",
        "-metadata",
        "artist=",
        "-metadata",
        "album=",
        "-metadata",
        "comment=",
        "-metadata",
        "encoder=",
    ],
};

impl Default for TransformPolicy {
    fn default() -> Self {
        DEFAULT_POLICY
    }
}

impl TransformPolicy {
    /// Full argument list for one transform, ending in `output`.
    pub fn args(&self, input: &Path, output: &Path, duration_secs: f64) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(64);
        args.extend(self.global.iter().map(OsString::from));
        args.push("-i".into());
        args.push(input.as_os_str().to_os_string());
        args.push("-t".into());
        args.push(duration_secs.to_string().into());

        if !self.video_filters.is_empty() {
            args.push("-vf".into());
            args.push(self.video_filters.join(",").into());
        }
        args.extend(self.video_codec.iter().map(OsString::from));

        args.extend(self.audio_codec.iter().map(OsString::from));
        if !self.audio_filters.is_empty() {
            args.push("-af".into());
            args.push(self.audio_filters.join(",").into());
        }

        args.extend(self.container.iter().map(OsString::from));
        args.extend(self.strip_metadata.iter().map(OsString::from));
        args.push(output.as_os_str().to_os_string());
        args
    }
}

/// Argument list for the probe invocation.
pub fn probe_args(input: &Path) -> Vec<OsString> {
    vec!["-i".into(), input.as_os_str().to_os_string()]
}
