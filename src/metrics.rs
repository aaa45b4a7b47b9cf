//! Per-stage counters exported through the `metrics` facade.
//!
//! Every counter carries a `stage` label with the stage name, e.g.
//! `pipeline.stage-2` or `pipeline.fan-out-1[3]`.

use metrics::{counter, describe_counter};

/// Items a stage took off its input queue
pub const ITEMS_IN: &str = "channelweld_items_in_total";
/// Items a stage pushed to its output queue
pub const ITEMS_OUT: &str = "channelweld_items_out_total";
/// Stage function failures
pub const STAGE_ERRORS: &str = "channelweld_stage_errors_total";

/// Register descriptions for every counter with the installed recorder.
pub fn describe() {
    describe_counter!(ITEMS_IN, "Items received by a pipeline stage");
    describe_counter!(ITEMS_OUT, "Items emitted by a pipeline stage");
    describe_counter!(STAGE_ERRORS, "Stage function failures");
}

pub(crate) fn record_received(stage: &str) {
    counter!(ITEMS_IN, "stage" => stage.to_string()).increment(1);
}

pub(crate) fn record_emitted(stage: &str) {
    counter!(ITEMS_OUT, "stage" => stage.to_string()).increment(1);
}

pub(crate) fn record_error(stage: &str) {
    counter!(STAGE_ERRORS, "stage" => stage.to_string()).increment(1);
}
