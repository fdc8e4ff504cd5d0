//! Canned text extraction attached to documents when processing finishes.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::domain::{Document, DocumentCategory};

pub const CONFIDENCE_RANGE: RangeInclusive<u8> = 70..=99;

/// Below this confidence staff should check the extracted fields by hand.
pub const REVIEW_THRESHOLD: u8 = 85;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrResult {
    pub confidence: u8,
    pub extracted_text: String,
    pub fields: BTreeMap<String, String>,
}

impl OcrResult {
    pub fn needs_review(&self) -> bool {
        self.confidence < REVIEW_THRESHOLD
    }
}

/// Text extraction run once a document finishes processing.
pub trait OcrEngine {
    fn recognize(&self, document: &Document, rng: &mut StdRng) -> OcrResult;
}

/// Returns canned text per document category with a random confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockOcrEngine;

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, document: &Document, rng: &mut StdRng) -> OcrResult {
        mock_result(document, rng)
    }
}

fn mock_result(document: &Document, rng: &mut StdRng) -> OcrResult {
    let confidence = rng.gen_range(CONFIDENCE_RANGE);
    let mut fields = BTreeMap::new();
    fields.insert("file_name".to_string(), document.name.clone());

    let extracted_text = match document.category {
        DocumentCategory::Identification => {
            fields.insert("document_type".to_string(), "National ID".to_string());
            fields.insert(
                "id_number".to_string(),
                format!("{:09}", rng.gen_range(100_000_000u32..=999_999_999)),
            );
            "GOVERNMENT OF JAMAICA NATIONAL IDENTIFICATION CARD".to_string()
        }
        DocumentCategory::SitePlan => {
            fields.insert("scale".to_string(), "1:500".to_string());
            "SITE PLAN - PROPOSED WORKS WITHIN ROAD RESERVE".to_string()
        }
        DocumentCategory::ProofOfOwnership => {
            fields.insert(
                "volume_folio".to_string(),
                format!(
                    "Vol. {} Fol. {}",
                    rng.gen_range(1_000..=1_600),
                    rng.gen_range(1..=999)
                ),
            );
            "CERTIFICATE OF TITLE - REGISTRATION OF TITLES ACT".to_string()
        }
        DocumentCategory::InsuranceCertificate => {
            fields.insert("coverage".to_string(), "Public Liability".to_string());
            "CERTIFICATE OF INSURANCE - PUBLIC LIABILITY".to_string()
        }
        DocumentCategory::TrafficManagementPlan => {
            fields.insert("lanes_affected".to_string(), rng.gen_range(1..=2).to_string());
            "TRAFFIC MANAGEMENT PLAN - TEMPORARY LANE CLOSURE".to_string()
        }
        DocumentCategory::Other => "SUPPORTING DOCUMENT".to_string(),
    };

    OcrResult {
        confidence,
        extracted_text,
        fields,
    }
}
