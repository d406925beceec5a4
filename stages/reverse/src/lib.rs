//! `reverse` stage: reverses its input by Unicode scalar value, loadable
//! dynamically via [`pipeloom_abi::export_stage`].

pipeloom_abi::export_stage!("reverse", pipeloom_stages::reverse);
