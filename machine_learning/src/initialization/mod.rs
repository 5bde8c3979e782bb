mod param_init;

pub use param_init::ParamInit;
