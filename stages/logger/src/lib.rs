//! `logger` stage: an identity transform that writes its input to the log at
//! `info` level, loadable dynamically via [`pipeloom_abi::export_stage`].

fn transform(input: &str) -> Option<String> {
    pipeloom_stages::logger("logger", input)
}

pipeloom_abi::export_stage!("logger", transform);
