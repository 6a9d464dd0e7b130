//! Form templates for each notice category.

use crate::notice::{FormField, NoticeType};

impl NoticeType {
    /// Ordered, empty-valued field set for this category.
    ///
    /// Built fresh on every call: two forms for the same type never share a
    /// field instance.
    pub fn template(&self) -> Vec<FormField> {
        match self {
            Self::PlannedProcurement => vec![
                title(),
                FormField::with_tooltip("Estimated Value", "Total value including VAT, in GBP"),
                FormField::with_tooltip("Authority", "Contracting authority name"),
            ],
            Self::Tender => vec![
                title(),
                FormField::with_tooltip(
                    "CPV Code",
                    "Common Procurement Vocabulary code, e.g. 45233140-2",
                ),
                FormField::with_tooltip("Deadline", "Tender submission deadline"),
            ],
            Self::Transparency => vec![
                title(),
                FormField::with_tooltip("Justification", "Grounds for direct award"),
            ],
            Self::ContractAward => vec![
                title(),
                FormField::with_tooltip("Winner", "Name of the successful supplier"),
                FormField::with_tooltip("Award Date", "Date the contract was awarded"),
            ],
            Self::ContractChange => vec![
                title(),
                FormField::with_tooltip("Change Description", "What changed and why"),
            ],
            Self::ContractTermination => vec![
                title(),
                FormField::with_tooltip("Termination Reason", "Reason the contract ended early"),
            ],
            Self::Pipeline => vec![
                title(),
                FormField::with_tooltip("Upcoming Date", "Expected publication date"),
            ],
            Self::LowValue => vec![
                title(),
                FormField::with_tooltip("Amount", "Contract value, in GBP"),
            ],
        }
    }
}

fn title() -> FormField {
    FormField::with_tooltip("Title", "Short public title of the procurement")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(kind: NoticeType) -> Vec<String> {
        kind.template().into_iter().map(|f| f.key).collect()
    }

    #[test]
    fn tender_template_has_expected_fields() {
        assert_eq!(keys(NoticeType::Tender), ["Title", "CPV Code", "Deadline"]);
    }

    #[test]
    fn award_template_has_expected_fields() {
        assert_eq!(
            keys(NoticeType::ContractAward),
            ["Title", "Winner", "Award Date"]
        );
    }

    #[test]
    fn every_template_starts_with_empty_title() {
        for kind in NoticeType::ALL {
            let fields = kind.template();
            assert_eq!(fields[0].key, "Title", "{kind}");
            assert!(fields.iter().all(|f| f.value.is_empty()), "{kind}");
        }
    }

    #[test]
    fn templates_are_independent_instances() {
        for kind in NoticeType::ALL {
            let mut first = kind.template();
            let second = kind.template();
            assert_eq!(first, second);

            first[0].value.push_str("edited");
            assert!(second[0].value.is_empty());
            assert_ne!(first, kind.template());
        }
    }
}
