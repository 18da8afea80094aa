use crate::cli::{report, summary};
use crate::error::Result;
use crate::intent::{classify, Intent};

/// Keyword-routed analytics: classify the question, run the matching
/// canned analysis. Questions nothing matches are reported back instead of
/// being guessed at.
pub fn run(question: &[String]) -> Result<()> {
    let question = question.join(" ");
    if question.trim().is_empty() {
        println!("Ask something, e.g. `ivy ask show top expense categories`.");
        return Ok(());
    }

    match classify(&question) {
        Intent::Summary => summary::run(None, None, None, None, false),
        Intent::TopCategories {
            transaction_type,
            limit,
        } => report::top(transaction_type.as_str(), limit),
        Intent::ProviderAnalysis => report::providers(),
        Intent::RawQuery(text) => {
            println!("No canned analysis matches {text:?}.");
            println!(
                "Try `ivy summary`, `ivy report top`, `ivy report providers`, \
                 or `ivy list` for raw records."
            );
            Ok(())
        }
    }
}
