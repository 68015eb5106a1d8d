use proptest::prelude::*;
use rulesync_fs::{NormalizedPath, security};

proptest! {
    #[test]
    fn test_normalization_invariants(s in "\\PC*") {
        let path = NormalizedPath::new(&s);
        let as_str = path.as_str();

        prop_assert!(!as_str.contains('\\'));

        // Only a leading network prefix may contain a double slash.
        let is_network = as_str.starts_with("//") && !as_str.starts_with("///");
        if is_network {
            prop_assert!(!as_str[2..].contains("//"));
        } else {
            prop_assert!(!as_str.contains("//"));
        }

        // Normalizing twice changes nothing.
        let again = NormalizedPath::new(as_str);
        prop_assert_eq!(&path, &again);
    }

    #[test]
    fn test_no_dot_segments_survive(s in "[a-z./]{0,24}") {
        let path = NormalizedPath::new(&s);
        for component in path.as_str().split('/') {
            prop_assert!(component != "..");
        }
    }

    #[test]
    fn test_parent_traversal_always_rejected(name in "[a-z]{1,8}", depth in 1usize..5) {
        let base = tempfile::tempdir().unwrap();
        let input = format!("{}{}", "../".repeat(depth), name);
        prop_assert!(security::resolve(&input, base.path()).is_err());

        let encoded = input.replace("../", "%2e%2e%2f");
        prop_assert!(security::resolve(&encoded, base.path()).is_err());
    }
}
