
pub use test_ctx::{TestCtx, private_params, public_params};
