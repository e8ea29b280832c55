//! Foundational low-level utilities shared across graphprobe crates.
//!
//! Report files, clocks, bounded polling for eventually consistent reads and
//! the text helpers report renderers share.

pub mod clock;
pub mod poll;
pub mod report_io;
pub mod text;

pub use clock::{elapsed_ms, now_epoch_ms};
pub use poll::{poll_until, thread_sleeper, PollOutcome, PollPolicy};
pub use report_io::write_report_atomic;
pub use text::{mask_secret, preview, single_line};

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn unit_clock_reports_current_epoch_millis_and_elapsed_time() {
        let started = std::time::Instant::now();
        let now = now_epoch_ms();
        assert!(now > 1_700_000_000_000, "{now}");
        assert!(elapsed_ms(started) < 60_000);
    }

    #[test]
    fn unit_preview_truncates_on_char_boundaries() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("héllo wörld", 4), "héll...");
        assert_eq!(preview("exact", 5), "exact");
    }

    #[test]
    fn unit_mask_secret_never_echoes_value() {
        assert_eq!(mask_secret("granite-life"), "[MASKED]");
        assert_eq!(mask_secret("   "), "[EMPTY]");
    }

    #[test]
    fn unit_single_line_collapses_whitespace() {
        assert_eq!(single_line("a\n  b\tc "), "a b c");
    }

    proptest! {
        #[test]
        fn property_preview_keeps_a_char_boundary_prefix(
            input in ".{0,64}",
            max_chars in 0usize..32,
        ) {
            let shortened = preview(&input, max_chars);
            if input.chars().count() <= max_chars {
                prop_assert_eq!(shortened, input);
            } else {
                let kept = shortened.strip_suffix("...").unwrap_or(&shortened);
                prop_assert!(input.starts_with(kept));
                prop_assert_eq!(kept.chars().count(), max_chars);
            }
        }
    }
}
