use bjerrum::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Bridges workflow progress events to an indicatif progress bar.
pub struct SweepProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl SweepProgress {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    pub fn callback(&self) -> ProgressCallback<'_> {
        Box::new(move |event| self.handle(event))
    }

    fn handle(&self, event: Progress) {
        let mut bar = self.bar.lock().unwrap();
        match event {
            Progress::RunStart { total_sweeps } => {
                let pb = ProgressBar::new(total_sweeps);
                pb.set_style(
                    ProgressStyle::with_template(
                        "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} sweeps {msg}",
                    )
                    .expect("valid progress template"),
                );
                *bar = Some(pb);
            }
            Progress::SweepFinish { energy, drift, .. } => {
                if let Some(pb) = bar.as_ref() {
                    pb.set_message(format!("U = {:.4} kT, drift = {:.2e}", energy, drift));
                    pb.inc(1);
                }
            }
            Progress::Message(message) => {
                if let Some(pb) = bar.as_ref() {
                    pb.println(message);
                }
            }
            Progress::RunFinish => {
                if let Some(pb) = bar.take() {
                    pb.finish_with_message("done");
                }
            }
        }
    }
}
