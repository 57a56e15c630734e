use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenshotPolicy {
    None,
    OnFailure,
    All,
}

impl ScreenshotPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "none" => ScreenshotPolicy::None,
            "on-failure" => ScreenshotPolicy::OnFailure,
            "all" => ScreenshotPolicy::All,
            _ => return None,
        })
    }

    pub(crate) fn should_capture(self, step_failed: bool) -> bool {
        match self {
            ScreenshotPolicy::None => false,
            ScreenshotPolicy::OnFailure => step_failed,
            ScreenshotPolicy::All => true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExecutorSettings {
    pub headless: bool,
    pub default_timeout_ms: u64,
    pub output_root: PathBuf,
    pub screenshots: ScreenshotPolicy,
    pub generate_report: bool,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            headless: true,
            default_timeout_ms: 10_000,
            output_root: PathBuf::from("results"),
            screenshots: ScreenshotPolicy::OnFailure,
            generate_report: true,
        }
    }
}
