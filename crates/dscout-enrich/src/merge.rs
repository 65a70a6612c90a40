//! Merge policy for enrichment records: insert, replace, or skip, driven by
//! provenance rank rather than free-text source labels.

use std::collections::HashSet;

use dscout_core::{AwardBatch, Contact, District, TitleCategory};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Replaced,
    Skipped,
}

/// Merge one contact candidate into a district.
///
/// Order of checks: email identity first (identical addresses are always the
/// same person, whatever the display name says), then the title-category
/// holder, then a name-level duplicate check for contacts whose title matches
/// no category. A category can have at most one holder; replacing preserves
/// list position, and a new superintendent goes to index 0 as the headline
/// contact.
pub fn merge_contact(district: &mut District, incoming: Contact) -> MergeOutcome {
    if let Some(idx) = district.contacts.iter().position(|c| c.email_matches(&incoming)) {
        // Same person: refresh unless the incoming record is lower-provenance.
        if incoming.provenance >= district.contacts[idx].provenance {
            overwrite(&mut district.contacts[idx], incoming, false);
            return MergeOutcome::Replaced;
        }
        return MergeOutcome::Skipped;
    }

    match incoming.category() {
        Some(category) => match district.contact_in_category(category) {
            Some(idx) => {
                // Same role, different record: only a strictly higher rank may
                // take over, and it does so in place.
                if incoming.provenance > district.contacts[idx].provenance {
                    overwrite(&mut district.contacts[idx], incoming, true);
                    MergeOutcome::Replaced
                } else {
                    MergeOutcome::Skipped
                }
            }
            None => {
                if category == TitleCategory::Superintendent {
                    district.contacts.insert(0, incoming);
                } else {
                    district.contacts.push(incoming);
                }
                MergeOutcome::Inserted
            }
        },
        None => {
            let existing = district
                .contacts
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(&incoming.name));
            match existing {
                Some(idx) => {
                    if incoming.provenance >= district.contacts[idx].provenance {
                        overwrite(&mut district.contacts[idx], incoming, false);
                        MergeOutcome::Replaced
                    } else {
                        MergeOutcome::Skipped
                    }
                }
                None => {
                    district.contacts.push(incoming);
                    MergeOutcome::Inserted
                }
            }
        }
    }
}

/// Overwrite a contact in place. Optional fields only move forward: an
/// incoming record without an email or phone does not erase one we have.
fn overwrite(existing: &mut Contact, incoming: Contact, keep_title: bool) {
    existing.name = incoming.name;
    if incoming.email.is_some() {
        existing.email = incoming.email;
        existing.email_guessed = incoming.email_guessed;
    }
    if incoming.phone.is_some() {
        existing.phone = incoming.phone;
    }
    if incoming.source.is_some() {
        existing.source = incoming.source;
    }
    if !keep_title && incoming.title.is_some() {
        existing.title = incoming.title;
    }
    existing.provenance = existing.provenance.max(incoming.provenance);
}

/// Award enrichment is a full replace: the latest successful fetch is an
/// authoritative snapshot of a moving window, so nothing from the previous
/// batch survives.
pub fn merge_awards(district: &mut District, batch: AwardBatch) {
    district.federal_awards = batch.total;
    district.recent_awards = Some(batch.count);
    district.title_i_amount = (batch.title_i > 0.0).then_some(batch.title_i);
    district.award_details = batch.details;
}

/// Recompute a boolean flag across the whole collection from this run's
/// matched set. Districts outside the set get an explicit `false`, so stale
/// flags from earlier runs cannot linger.
pub fn apply_flag(districts: &mut [District], flag: &str, matched: &HashSet<Uuid>) {
    for district in districts {
        district
            .flags
            .insert(flag.to_string(), matched.contains(&district.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscout_core::{AwardRecord, Provenance};

    fn contact(name: &str, title: &str, email: Option<&str>, provenance: Provenance) -> Contact {
        Contact {
            name: name.into(),
            title: Some(title.into()),
            email: email.map(str::to_string),
            email_guessed: provenance == Provenance::Guessed,
            phone: None,
            source: None,
            provenance,
        }
    }

    fn award(amount: f64, program: &str, description: &str) -> AwardRecord {
        AwardRecord {
            amount,
            description: description.into(),
            program: program.into(),
            start_date: "2024-07-01".into(),
            year: "2024-2025".into(),
        }
    }

    #[test]
    fn merging_the_same_contact_twice_is_idempotent() {
        let mut district = District::new("Kent School District", "WA");
        let incoming = contact(
            "Israel Vela",
            "Superintendent",
            Some("israel.vela@kent.k12.wa.us"),
            Provenance::Verified,
        );
        assert_eq!(merge_contact(&mut district, incoming.clone()), MergeOutcome::Inserted);
        let after_first = district.contacts.clone();
        merge_contact(&mut district, incoming);
        assert_eq!(district.contacts, after_first);
    }

    #[test]
    fn guessed_contact_never_replaces_manual_research() {
        let mut district = District::new("Tacoma Public Schools", "WA");
        let mut manual = contact(
            "Joshua Garcia",
            "Superintendent",
            Some("jgarcia@tacoma.k12.wa.us"),
            Provenance::Verified,
        );
        manual.source = Some("Manual research".into());
        merge_contact(&mut district, manual.clone());

        let guessed = contact(
            "J. Garcia",
            "Superintendent",
            Some("j.garcia@tacoma.k12.wa.us"),
            Provenance::Guessed,
        );
        assert_eq!(merge_contact(&mut district, guessed), MergeOutcome::Skipped);
        assert_eq!(district.contacts.len(), 1);
        assert_eq!(district.contacts[0].name, "Joshua Garcia");
        assert_eq!(district.contacts[0].source.as_deref(), Some("Manual research"));
    }

    #[test]
    fn manual_research_replaces_a_guessed_contact_in_place() {
        let mut district = District::new("Kent School District", "WA");
        merge_contact(
            &mut district,
            contact(
                "Wrong Person",
                "Superintendent",
                Some("wrong@kent.k12.wa.us"),
                Provenance::Guessed,
            ),
        );
        merge_contact(
            &mut district,
            contact("Just A. Teacher", "Math Lead", None, Provenance::Guessed),
        );

        let outcome = merge_contact(
            &mut district,
            contact(
                "Israel Vela",
                "Superintendent",
                Some("israel.vela@kent.k12.wa.us"),
                Provenance::Verified,
            ),
        );
        assert_eq!(outcome, MergeOutcome::Replaced);
        // replaced in place: still at index 0, still exactly one superintendent
        assert_eq!(district.contacts[0].name, "Israel Vela");
        assert_eq!(
            district.contacts[0].email.as_deref(),
            Some("israel.vela@kent.k12.wa.us")
        );
        assert!(!district.contacts[0].email_guessed);
        assert_eq!(district.contacts.len(), 2);
    }

    #[test]
    fn identical_emails_are_the_same_person_despite_name_differences() {
        let mut district = District::new("Bellevue School District", "WA");
        merge_contact(
            &mut district,
            contact(
                "Kelly Aramaki",
                "Superintendent",
                Some("aramakik@bsd405.org"),
                Provenance::Directory,
            ),
        );
        let outcome = merge_contact(
            &mut district,
            contact(
                "Dr. Kelly Aramaki",
                "Superintendent",
                Some("ARAMAKIK@BSD405.ORG"),
                Provenance::Verified,
            ),
        );
        assert_eq!(outcome, MergeOutcome::Replaced);
        assert_eq!(district.contacts.len(), 1);
        assert_eq!(district.contacts[0].name, "Dr. Kelly Aramaki");
    }

    #[test]
    fn a_category_never_gets_a_second_holder() {
        let mut district = District::new("Seattle Public Schools", "WA");
        merge_contact(
            &mut district,
            contact(
                "Krista Lundquist",
                "Chief Technology Officer",
                Some("klundquist@seattleschools.org"),
                Provenance::Verified,
            ),
        );
        let outcome = merge_contact(
            &mut district,
            contact("Someone Else", "CIO", Some("selse@seattleschools.org"), Provenance::Directory),
        );
        assert_eq!(outcome, MergeOutcome::Skipped);
        assert_eq!(district.contacts.len(), 1);
    }

    #[test]
    fn superintendent_is_inserted_at_the_head() {
        let mut district = District::new("Houston ISD", "TX");
        merge_contact(
            &mut district,
            contact("Mark Bedell", "Chief Technology Officer", None, Provenance::Verified),
        );
        merge_contact(
            &mut district,
            contact("Mike Miles", "Superintendent", None, Provenance::Directory),
        );
        assert_eq!(district.contacts[0].name, "Mike Miles");
        assert_eq!(district.contacts[1].name, "Mark Bedell");
    }

    #[test]
    fn uncategorized_titles_are_stored_but_do_not_block() {
        let mut district = District::new("Austin ISD", "TX");
        merge_contact(
            &mut district,
            contact("Pat Doe", "Board Liaison", None, Provenance::Directory),
        );
        merge_contact(
            &mut district,
            contact("Sam Roe", "Superintendent", None, Provenance::Directory),
        );
        assert_eq!(district.contacts.len(), 2);
        assert_eq!(district.contacts[0].name, "Sam Roe");
    }

    #[test]
    fn award_merge_fully_replaces_prior_data() {
        let mut district = District::new("Dallas ISD", "TX");
        merge_awards(
            &mut district,
            AwardBatch::from_awards(vec![award(500.0, "84.027", "old IDEA grant")], 10),
        );
        assert_eq!(district.federal_awards, 500.0);

        merge_awards(
            &mut district,
            AwardBatch::from_awards(
                vec![
                    award(300.0, "84.010", "title i grant"),
                    award(400.0, "84.425", "esser grant"),
                ],
                10,
            ),
        );
        assert_eq!(district.federal_awards, 700.0);
        assert_eq!(district.recent_awards, Some(2));
        assert_eq!(district.title_i_amount, Some(300.0));
        assert_eq!(district.award_details.len(), 2);
        assert!(district
            .award_details
            .iter()
            .all(|a| a.description != "old IDEA grant"));
    }

    #[test]
    fn title_i_amount_survives_the_detail_cap() {
        let mut district = District::new("Austin ISD", "TX");
        merge_awards(
            &mut district,
            AwardBatch::from_awards(
                vec![
                    award(1000.0, "84.027", "idea grant"),
                    award(100.0, "84.010", "title i grant"),
                ],
                1,
            ),
        );
        assert_eq!(district.title_i_amount, Some(100.0));
        assert_eq!(district.award_details.len(), 1);
        assert_eq!(district.federal_awards, 1100.0);
    }

    #[test]
    fn flags_are_recomputed_from_scratch() {
        let mut districts = vec![
            District::new("Kent School District", "WA"),
            District::new("Tacoma Public Schools", "WA"),
        ];
        let first_run: HashSet<Uuid> = [districts[0].id].into_iter().collect();
        apply_flag(&mut districts, "uses_edclub", &first_run);
        assert_eq!(districts[0].flags.get("uses_edclub"), Some(&true));
        assert_eq!(districts[1].flags.get("uses_edclub"), Some(&false));

        // next run matches the other district; the stale flag must clear
        let second_run: HashSet<Uuid> = [districts[1].id].into_iter().collect();
        apply_flag(&mut districts, "uses_edclub", &second_run);
        assert_eq!(districts[0].flags.get("uses_edclub"), Some(&false));
        assert_eq!(districts[1].flags.get("uses_edclub"), Some(&true));
    }
}
