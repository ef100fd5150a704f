use admission_desk::error::AppError;
use admission_desk::workflows::admission::listing::{run_query, ListingQuery, SortField};
use admission_desk::workflows::admission::{
    listing_to_csv, AdmissionError, AdmissionRepository, AdmissionType, CandidateSnapshot,
    InitiateCommand,
    PropositionId, SignatoryId, SignatoryOpinion, TrainingSnapshot,
};
use clap::Args;

use crate::infra::{build_service, ApiAdmissionService};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of synthetic propositions to seed.
    #[arg(long, default_value_t = 3)]
    pub(crate) candidates: u32,
    /// Print the listing as CSV instead of a table.
    #[arg(long)]
    pub(crate) export_csv: bool,
}

const FIRST_NAMES: [&str; 5] = ["Marie", "Hugo", "Amina", "Jonas", "Livia"];
const LAST_NAMES: [&str; 5] = ["Dupont", "Verstraeten", "Haddad", "Peeters", "Rossi"];

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = build_service("enrollment@university.example");

    println!("Admission desk demo: {} candidate(s)", args.candidates);
    for index in 0..args.candidates {
        let id = seed_proposition(&service, index)?;

        // Spread the seeded files across the workflow stages.
        match index % 3 {
            0 => {
                service.cdd_take_charge(&id, "cdd-manager")?;
                service.cdd_approve(&id, "cdd-manager")?;
                service.sic_approve(&id, "sic-manager")?;
            }
            1 => {
                service.cdd_take_charge(&id, "cdd-manager")?;
                service.cdd_refuse(
                    &id,
                    &["The research plan lacks a timeline.".to_string()],
                    "cdd-manager",
                )?;
            }
            _ => {}
        }
    }

    let records = service.repository().list().map_err(AdmissionError::from)?;
    let page = run_query(
        service.catalog(),
        &records,
        &ListingQuery {
            sort: SortField::Status,
            page_size: records.len().max(1),
            ..ListingQuery::default()
        },
    );

    if args.export_csv {
        println!("{}", listing_to_csv(&page.rows)?);
        return Ok(());
    }

    println!("\n{:<14} {:<22} {:<8} status", "reference", "candidate", "training");
    for row in &page.rows {
        println!(
            "{:<14} {:<22} {:<8} {}",
            row.reference, row.candidate, row.training, row.status_label,
        );
    }
    Ok(())
}

fn seed_proposition(
    service: &ApiAdmissionService,
    index: u32,
) -> Result<PropositionId, AppError> {
    let first = FIRST_NAMES[index as usize % FIRST_NAMES.len()];
    let last = LAST_NAMES[index as usize % LAST_NAMES.len()];
    let record = service.initiate(InitiateCommand {
        admission_type: AdmissionType::Admission,
        candidate: CandidateSnapshot {
            registration_id: format!("004{index:05}"),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}.{}@mail.example", first.to_lowercase(), last.to_lowercase()),
        },
        training: TrainingSnapshot {
            acronym: "SC3DP".to_string(),
            title: "Doctorate in Sciences".to_string(),
            academic_year: 2025,
        },
        author: "candidate".to_string(),
    })?;
    let id = record.proposition.id;

    service.add_promoter(
        &id,
        SignatoryId(format!("promoter-{index}")),
        "Alice Martin",
        "alice@uni.example",
        "manager",
    )?;
    service.add_committee_member(
        &id,
        SignatoryId(format!("member-a-{index}")),
        "Badr Haddad",
        "badr@uni.example",
        "manager",
    )?;
    service.add_committee_member(
        &id,
        SignatoryId(format!("member-b-{index}")),
        "Chris Leroy",
        "chris@uni.example",
        "manager",
    )?;
    service.request_signatures(&id, "candidate")?;
    for signatory in [
        format!("promoter-{index}"),
        format!("member-a-{index}"),
        format!("member-b-{index}"),
    ] {
        service.record_opinion(
            &id,
            &SignatoryId(signatory),
            SignatoryOpinion::Approve {
                internal_comment: None,
                external_comment: None,
            },
        )?;
    }
    service.submit(&id, &["exp-1".to_string()], "candidate")?;
    Ok(id)
}
