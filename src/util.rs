use chrono::{DateTime, Utc};
use rand::Rng;
use time_humanize::HumanTime;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 7;

/// `<unix millis>-<7 base36 chars>`, unique enough for a local library.
pub fn generate_id<R: Rng + ?Sized>(at: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", at.timestamp_millis(), suffix)
}

/// "3 minutes ago" style age of `at` relative to `now`.
pub fn age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds().max(0);
    HumanTime::from_seconds(-secs).to_string()
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let variance = data.iter().map(|v| (v - m).powi(2)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_generate_id_format() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let id = generate_id(at, &mut StdRng::seed_from_u64(1));
        let (millis, suffix) = id.split_once('-').unwrap();
        assert_eq!(millis, "1700000000123");
        assert_eq!(suffix.len(), 7);
        assert!(suffix.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_generate_id_differs_between_draws() {
        let at = Utc::now();
        let mut rng = StdRng::seed_from_u64(5);
        assert_ne!(generate_id(at, &mut rng), generate_id(at, &mut rng));
    }

    #[test]
    fn test_age_is_in_the_past() {
        let now = Utc::now();
        let text = age(now - Duration::hours(3), now);
        assert!(text.contains("hour"), "{text}");
        assert!(text.contains("ago"), "{text}");
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[40., 50., 60.]), Some(50.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[2., 4., 4., 4., 5., 5., 7., 9.]), Some(2.0));
        assert_eq!(std_dev(&[72.0]), Some(0.0));
        assert_eq!(std_dev(&[]), None);
    }
}
