//! `rotate` stage: right-rotates its input by one character, loadable
//! dynamically via [`pipeloom_abi::export_stage`].

pipeloom_abi::export_stage!("rotate", pipeloom_stages::rotate);

#[cfg(test)]
mod tests {
    use pipeloom_stages::rotate;

    #[test]
    fn rotates_ascii() {
        assert_eq!(rotate("abc").unwrap(), "cab");
    }
}
