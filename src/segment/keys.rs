use serde::{Deserialize, Serialize};

/// Canonical identifiers for the fixed set of package-insert sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    Warning,
    Contraindications,
    Efficacy,
    EfficacyNotes,
    Dosage,
    DosageNotes,
    Precautions,
    ImportantNotes,
    SpecialPatientNotes,
    Interactions,
    SideEffects,
    LabInfluence,
    Overdose,
    ApplicationNotes,
    OtherNotes,
    Pharmacokinetics,
    ClinicalResults,
    Pharmacodynamics,
    CompoundProperties,
    HandlingNotes,
    ApprovalConditions,
    Packaging,
    MainReferences,
    ContactInfo,
}

impl SectionKey {
    pub const ALL: [SectionKey; 24] = [
        SectionKey::Warning,
        SectionKey::Contraindications,
        SectionKey::Efficacy,
        SectionKey::EfficacyNotes,
        SectionKey::Dosage,
        SectionKey::DosageNotes,
        SectionKey::Precautions,
        SectionKey::ImportantNotes,
        SectionKey::SpecialPatientNotes,
        SectionKey::Interactions,
        SectionKey::SideEffects,
        SectionKey::LabInfluence,
        SectionKey::Overdose,
        SectionKey::ApplicationNotes,
        SectionKey::OtherNotes,
        SectionKey::Pharmacokinetics,
        SectionKey::ClinicalResults,
        SectionKey::Pharmacodynamics,
        SectionKey::CompoundProperties,
        SectionKey::HandlingNotes,
        SectionKey::ApprovalConditions,
        SectionKey::Packaging,
        SectionKey::MainReferences,
        SectionKey::ContactInfo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKey::Warning => "warning",
            SectionKey::Contraindications => "contraindications",
            SectionKey::Efficacy => "efficacy",
            SectionKey::EfficacyNotes => "efficacy_notes",
            SectionKey::Dosage => "dosage",
            SectionKey::DosageNotes => "dosage_notes",
            SectionKey::Precautions => "precautions",
            SectionKey::ImportantNotes => "important_notes",
            SectionKey::SpecialPatientNotes => "special_patient_notes",
            SectionKey::Interactions => "interactions",
            SectionKey::SideEffects => "side_effects",
            SectionKey::LabInfluence => "lab_influence",
            SectionKey::Overdose => "overdose",
            SectionKey::ApplicationNotes => "application_notes",
            SectionKey::OtherNotes => "other_notes",
            SectionKey::Pharmacokinetics => "pharmacokinetics",
            SectionKey::ClinicalResults => "clinical_results",
            SectionKey::Pharmacodynamics => "pharmacodynamics",
            SectionKey::CompoundProperties => "compound_properties",
            SectionKey::HandlingNotes => "handling_notes",
            SectionKey::ApprovalConditions => "approval_conditions",
            SectionKey::Packaging => "packaging",
            SectionKey::MainReferences => "main_references",
            SectionKey::ContactInfo => "contact_info",
        }
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
