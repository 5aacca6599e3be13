//! Request execution: concurrent dispatch and the toggle vote

pub mod consensus;
pub mod dispatcher;

pub use consensus::{desired_state, toggle_by_majority, STATUS_CODE};
pub use dispatcher::{
    dispatch_many, dispatch_one, execute, invoke_targets, DeviceResult, DispatchOutcome,
    DispatchRequest, DispatchResult, Dispatcher, InvokeResponse,
};
