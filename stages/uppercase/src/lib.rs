//! `uppercase` stage: ASCII-uppercases its input, loadable dynamically via
//! [`pipeloom_abi::export_stage`].

pipeloom_abi::export_stage!("uppercase", pipeloom_stages::uppercase);

#[cfg(test)]
mod tests {
    use pipeloom_stages::uppercase;

    #[test]
    fn uppercases_ascii() {
        assert_eq!(uppercase("hello").unwrap(), "HELLO");
    }
}
