#![allow(dead_code)]

use faers_surveillance::data::{Case, DrugRecord, OutcomeRecord, ReactionRecord};

pub fn case(id: &str) -> Case {
    Case {
        case_id: Some(id.to_string()),
        ..Case::default()
    }
}

pub fn case_on(id: &str, receipt: &str) -> Case {
    Case {
        case_id: Some(id.to_string()),
        receipt_date: Some(receipt.to_string()),
        ..Case::default()
    }
}

pub fn drug(case_id: &str, name: &str, role: &str) -> DrugRecord {
    DrugRecord {
        case_id: Some(case_id.to_string()),
        drug_name: Some(name.to_string()),
        role_code: Some(role.to_string()),
        ..DrugRecord::default()
    }
}

pub fn reaction(case_id: &str, term: &str) -> ReactionRecord {
    ReactionRecord {
        case_id: Some(case_id.to_string()),
        reaction: Some(term.to_string()),
        ..ReactionRecord::default()
    }
}

pub fn outcome(case_id: &str, code: &str) -> OutcomeRecord {
    OutcomeRecord {
        case_id: Some(case_id.to_string()),
        outcome_code: Some(code.to_string()),
        ..OutcomeRecord::default()
    }
}

/// Same rows, tagged with a report version (`primaryid`).
pub fn version(primary_id: &str) -> Option<String> {
    Some(primary_id.to_string())
}
