//! `expand` stage: inserts a space between adjacent characters, loadable
//! dynamically via [`pipeloom_abi::export_stage`].

pipeloom_abi::export_stage!("expand", pipeloom_stages::expand);
