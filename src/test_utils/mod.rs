pub(crate) mod backend;
pub(crate) mod http;
pub(crate) mod samples;

pub(crate) use backend::{RecordingNotifier, ScriptedBackend, coordinator_with};
pub(crate) use http::{
    OTHER_EMAIL, OTHER_PASSWORD, assert_failure, envelope_data, log_in_as, log_in_token,
    test_server, two_user_test_server,
};
pub(crate) use samples::{sample_account, sample_budget, sample_goal, sample_transaction};
