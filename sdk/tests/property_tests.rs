use proptest::prelude::*;
use sdk::errors::{AvatalkErrorExt, EngineError};
use sdk::types::Tone;

proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "\\PC*") {
        // Every error kind must carry a non-empty static hint that never
        // echoes the backend text it wraps.
        let errs = vec![
            EngineError::ConfigurationMissing(error_str.clone()),
            EngineError::Config(error_str.clone()),
            EngineError::BackendUnavailable(error_str.clone()),
            EngineError::BackendRejected(error_str.clone()),
            EngineError::SubmissionRejected(error_str.clone()),
            EngineError::TransportError(error_str.clone()),
            EngineError::PollingAborted { failures: 4, last_error: error_str.clone() },
            EngineError::KeyringError(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            if error_str.len() > 24 {
                prop_assert!(!hint.contains(error_str.as_str()));
            }
        }
    }
}

proptest! {
    #[test]
    fn test_tone_display_parse_round_trip(index in 0usize..Tone::ALL.len(), upper in any::<bool>()) {
        let tone = Tone::ALL[index];
        let label = if upper {
            tone.to_string().to_uppercase()
        } else {
            tone.to_string().to_lowercase()
        };
        prop_assert_eq!(label.parse::<Tone>().unwrap(), tone);
    }
}
