use crate::app::batch::BatchSummary;
use crate::app::spin_force::SpinForceReport;
use tracing::{info, warn};

pub fn report_batch_summary(summary: &BatchSummary) {
    info!("===========================================");
    info!("       Sweep Summary");
    info!("===========================================");
    info!("  Tags processed:  {}", summary.tags);
    info!("  Frames accepted: {}", summary.accepted);
    info!("  Frames rejected: {}", summary.rejected);
    info!("  Frames written:  {}", summary.frames_written);

    if summary.frames_written == 0 {
        warn!("No frame was written, the dataset is empty");
    }
}

pub fn report_spin_force(report: &SpinForceReport) {
    let difference = report.hellmann_feynman - report.finite_difference;
    info!(
        "Spin force on atom {} (interval {}):",
        report.atom, report.interval
    );
    info!("  Hellmann-Feynman spin force:  {:+.8e}", report.hellmann_feynman);
    info!("  Finite difference spin force: {:+.8e}", report.finite_difference);
    info!("  Difference:                   {:+.8e}", difference);
}
