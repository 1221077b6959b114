use crate::capture::CaptureDevice;
use crate::prelude::{PipelineError, PipelineResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

/// External program plus argument templates.
///
/// Arguments may contain `{name}` placeholders that are substituted at run
/// time, e.g. `{duration_ms}`, `{input}` and `{output}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    pub fn render_args(&self, vars: &[(&str, String)]) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                vars.iter().fold(arg.clone(), |acc, (name, value)| {
                    acc.replace(&format!("{{{}}}", name), value)
                })
            })
            .collect()
    }

    pub fn command(&self, vars: &[(&str, String)]) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.render_args(vars));
        command
    }

    /// Runs to completion; the error carries the exit status and stderr.
    pub fn run(&self, vars: &[(&str, String)]) -> Result<(), String> {
        let args = self.render_args(vars);
        debug!("running {} {:?}", self.program, args);
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| format!("spawning {}: {}", self.program, err))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }
}

/// Container conversion applied after capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemuxSettings {
    pub command: CommandTemplate,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub command: CommandTemplate,
    pub raw_extension: String,
    pub remux: Option<RemuxSettings>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            command: CommandTemplate::new(
                "rpicam-vid",
                &[
                    "--nopreview",
                    "--timeout",
                    "{duration_ms}",
                    "--framerate",
                    "20",
                    "--output",
                    "{output}",
                ],
            ),
            raw_extension: "h264".into(),
            remux: Some(RemuxSettings {
                command: CommandTemplate::new(
                    "ffmpeg",
                    &[
                        "-y",
                        "-loglevel",
                        "error",
                        "-framerate",
                        "20",
                        "-i",
                        "{input}",
                        "-c",
                        "copy",
                        "{output}",
                    ],
                ),
                extension: "mp4".into(),
            }),
        }
    }
}

/// Capture device driven by external commands (camera CLI, then remuxer).
pub struct CommandCapture {
    settings: CaptureSettings,
}

impl CommandCapture {
    pub fn new(settings: CaptureSettings) -> Self {
        Self { settings }
    }
}

impl CaptureDevice for CommandCapture {
    fn raw_extension(&self) -> &str {
        &self.settings.raw_extension
    }

    fn start_capture(&mut self, duration: Duration, output: &Path) -> PipelineResult<()> {
        self.settings
            .command
            .run(&[
                ("duration_ms", duration.as_millis().to_string()),
                ("duration_s", duration.as_secs_f64().to_string()),
                ("output", output.display().to_string()),
            ])
            .map_err(PipelineError::CaptureFailed)
    }

    fn remux_extension(&self) -> Option<&str> {
        self.settings
            .remux
            .as_ref()
            .map(|remux| remux.extension.as_str())
    }

    fn remux(&mut self, input: &Path, output: &Path) -> PipelineResult<()> {
        let Some(remux) = &self.settings.remux else {
            return Ok(());
        };
        remux
            .command
            .run(&[
                ("input", input.display().to_string()),
                ("output", output.display().to_string()),
            ])
            .map_err(PipelineError::CaptureFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_substituted_in_every_argument() {
        let template = CommandTemplate::new("cam", &["-t", "{duration_ms}", "-o={output}", "-v"]);
        let args = template.render_args(&[
            ("duration_ms", "5000".into()),
            ("output", "videos/a.h264".into()),
        ]);
        assert_eq!(args, vec!["-t", "5000", "-o=videos/a.h264", "-v"]);
    }

    #[test]
    fn default_settings_remux_raw_h264_into_mp4() {
        let settings = CaptureSettings::default();
        assert_eq!(settings.raw_extension, "h264");
        assert_eq!(settings.remux.unwrap().extension, "mp4");
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_reports_capture_failure() {
        let mut capture = CommandCapture::new(CaptureSettings {
            command: CommandTemplate::new("sh", &["-c", "echo no camera >&2; exit 3"]),
            raw_extension: "h264".into(),
            remux: None,
        });
        let err = capture
            .start_capture(Duration::from_secs(1), Path::new("unused.h264"))
            .unwrap_err();
        assert_eq!(err.kind(), "CaptureFailed");
        assert!(err.to_string().contains("no camera"));
    }
}
