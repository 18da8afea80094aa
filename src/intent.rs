use crate::models::TransactionType;

/// What a free-form question is actually asking for.
///
/// Classification is a pure function over the normalized question text, so
/// the routing is testable without any model in the loop. Questions that
/// match no canned analysis fall through to `RawQuery`, carrying the text
/// for whatever external query engine the caller wires up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Summary,
    TopCategories {
        transaction_type: TransactionType,
        limit: usize,
    },
    ProviderAnalysis,
    RawQuery(String),
}

const SUMMARY_KEYWORDS: &[&str] = &["summary", "total", "profit", "overview", "net"];
const CATEGORY_KEYWORDS: &[&str] = &["categories", "category", "top", "biggest", "largest"];
const PROVIDER_KEYWORDS: &[&str] = &["stripe", "payment", "invoice", "provider"];

const DEFAULT_TOP_LIMIT: usize = 5;

fn contains_any(question: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| question.contains(k))
}

pub fn classify(question: &str) -> Intent {
    let q = question.to_lowercase();

    if contains_any(&q, CATEGORY_KEYWORDS) {
        let transaction_type = if q.contains("income") {
            TransactionType::Income
        } else {
            TransactionType::Expense
        };
        return Intent::TopCategories {
            transaction_type,
            limit: DEFAULT_TOP_LIMIT,
        };
    }
    if contains_any(&q, PROVIDER_KEYWORDS) {
        return Intent::ProviderAnalysis;
    }
    if contains_any(&q, SUMMARY_KEYWORDS) || q.contains("revenue") || q.contains("expenses") {
        return Intent::Summary;
    }
    Intent::RawQuery(question.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_questions() {
        assert_eq!(classify("What's my financial summary?"), Intent::Summary);
        assert_eq!(classify("total profit this year"), Intent::Summary);
        assert_eq!(classify("Revenue overview please"), Intent::Summary);
    }

    #[test]
    fn test_top_categories_questions() {
        assert_eq!(
            classify("Show top expense categories"),
            Intent::TopCategories {
                transaction_type: TransactionType::Expense,
                limit: 5
            }
        );
        assert_eq!(
            classify("biggest spend"),
            Intent::TopCategories {
                transaction_type: TransactionType::Expense,
                limit: 5
            }
        );
    }

    #[test]
    fn test_top_income_categories() {
        assert_eq!(
            classify("top income categories"),
            Intent::TopCategories {
                transaction_type: TransactionType::Income,
                limit: 5
            }
        );
    }

    #[test]
    fn test_provider_questions() {
        assert_eq!(classify("How much STRIPE revenue?"), Intent::ProviderAnalysis);
        assert_eq!(classify("show me the invoices"), Intent::ProviderAnalysis);
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(classify("FINANCIAL SUMMARY"), Intent::Summary);
    }

    #[test]
    fn test_unmatched_falls_through_to_raw_query() {
        let q = "  list transactions over $500 in July  ";
        match classify(q) {
            Intent::RawQuery(text) => {
                assert_eq!(text, "list transactions over $500 in July");
            }
            other => panic!("expected RawQuery, got {other:?}"),
        }
    }
}
