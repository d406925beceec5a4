//! `typewriter` stage: an identity transform that writes each character to
//! the log at `debug` level with a delay between characters, loadable
//! dynamically via [`pipeloom_abi::export_stage`].
//!
//! The delay is read once, from `PIPELOOM_TYPEWRITER_DELAY_MS`, the moment
//! this cdylib's transform runs for the first time; the core and the ABI
//! bridge never touch environment variables themselves (see spec §7).

use std::sync::OnceLock;
use std::time::Duration;

const DEFAULT_DELAY_MS: u64 = 80;

fn delay() -> Duration {
    static DELAY: OnceLock<Duration> = OnceLock::new();
    *DELAY.get_or_init(|| {
        std::env::var("PIPELOOM_TYPEWRITER_DELAY_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_DELAY_MS))
    })
}

fn transform(input: &str) -> Option<String> {
    pipeloom_stages::typewriter("typewriter", delay(), input)
}

pipeloom_abi::export_stage!("typewriter", transform);

#[cfg(test)]
mod tests {
    use pipeloom_stages::typewriter;
    use std::time::Duration;

    #[test]
    fn passes_input_through_with_no_delay() {
        assert_eq!(
            typewriter("typewriter", Duration::ZERO, "hi").unwrap(),
            "hi"
        );
    }
}
