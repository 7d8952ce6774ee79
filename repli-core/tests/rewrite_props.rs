use proptest::prelude::*;
use repli_core::rewrite::RewriteTable;

const FILLER: &[&str] = &["report", "dashboard", "2024", "Q3", "summary.md", "-", "/"];

fn table(month: u32) -> RewriteTable {
    RewriteTable::month_advance(&format!("2025-{month:02}")).unwrap()
}

/// A month table together with text built from its own tokens (both the
/// old and the new period) mixed with filler words.
fn month_and_words() -> impl Strategy<Value = (RewriteTable, String)> {
    (1u32..=12).prop_flat_map(|month| {
        let t = table(month);
        let mut vocab: Vec<String> = FILLER.iter().map(|s| s.to_string()).collect();
        for r in &t.rules {
            vocab.push(r.find.clone());
            vocab.push(r.replace.clone());
        }
        prop::collection::vec(prop::sample::select(vocab), 0..40)
            .prop_map(move |v| (t.clone(), v.join(" ")))
    })
}

proptest! {
    #[test]
    fn text_without_tokens_is_unchanged(month in 1u32..=12, text in "[013-9xyz ,.!\n-]{0,200}") {
        prop_assert_eq!(table(month).apply(&text), text);
    }

    #[test]
    fn month_table_is_idempotent((t, text) in month_and_words()) {
        let once = t.apply(&text);
        prop_assert_eq!(t.apply(&once), once.clone());
    }

    #[test]
    fn no_source_tokens_survive((t, text) in month_and_words()) {
        let out = t.apply(&text);
        for r in &t.rules {
            prop_assert!(!out.contains(&r.find), "{:?} left in {:?}", r.find, out);
        }
    }
}
