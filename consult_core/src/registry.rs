//! File-backed health registry.
//!
//! Stands in for the national registry on a single workstation:
//! - `registry.json` holds every enrolled patient with their history and
//!   one prescription per illness, read under a shared lock and replaced
//!   atomically under an exclusive one
//! - `transmissions.jsonl` is an append-only log of every accepted
//!   prescription, one JSON object per line
//!
//! A store that exists but cannot be read or parsed is reported as a
//! connectivity failure: the registry is unreachable, not empty.

use crate::services::HealthRegistry;
use crate::{
    Error, HealthCardId, MedicalHistory, MedicalPrescription, PrescriptionCode, Result,
};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

const STORE_FILE: &str = "registry.json";
const TRANSMISSIONS_FILE: &str = "transmissions.jsonl";

/// Everything the registry knows about one patient
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatientRecord {
    pub history: MedicalHistory,
    /// Active prescription per illness
    pub prescriptions: BTreeMap<String, MedicalPrescription>,
}

/// On-disk contents of `registry.json`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegistryStore {
    pub patients: BTreeMap<HealthCardId, PatientRecord>,
}

/// One accepted prescription in the transmission log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransmissionRecord {
    pub id: Uuid,
    pub transmitted_at: DateTime<Utc>,
    pub patient: HealthCardId,
    pub illness: String,
    pub code: PrescriptionCode,
    pub prescription: MedicalPrescription,
}

/// Registry stored in a local directory
pub struct FileRegistry {
    dir: PathBuf,
}

impl FileRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    pub fn transmissions_path(&self) -> PathBuf {
        self.dir.join(TRANSMISSIONS_FILE)
    }

    /// Register a patient and open an empty prescription for an illness
    ///
    /// Existing histories and prescriptions are left as they are.
    pub fn enroll(
        &mut self,
        patient: &HealthCardId,
        membership_number: u32,
        illness: &str,
    ) -> Result<()> {
        let prescription = MedicalPrescription::new(patient.clone(), membership_number, illness)?;

        let mut store = self.load_store()?;
        let record = store
            .patients
            .entry(patient.clone())
            .or_insert_with(|| PatientRecord {
                history: MedicalHistory::new(patient.clone(), membership_number),
                prescriptions: BTreeMap::new(),
            });
        record
            .prescriptions
            .entry(illness.to_string())
            .or_insert(prescription);

        self.save_store(&store)?;
        tracing::info!("Enrolled patient {} for '{}'", patient, illness);
        Ok(())
    }

    fn load_store(&self) -> Result<RegistryStore> {
        let path = self.store_path();
        if !path.exists() {
            tracing::debug!("No registry store at {:?}, starting empty", path);
            return Ok(RegistryStore::default());
        }

        let file = File::open(&path).map_err(|e| unreachable_store(&path, e))?;
        file.lock_shared().map_err(|e| unreachable_store(&path, e))?;

        let mut contents = String::new();
        let read = BufReader::new(&file).read_to_string(&mut contents);
        if let Err(e) = file.unlock() {
            tracing::warn!("Failed to unlock registry store {:?}: {}", path, e);
        }
        read.map_err(|e| unreachable_store(&path, e))?;

        serde_json::from_str(&contents).map_err(|e| unreachable_store(&path, e))
    }

    fn save_store(&self, store: &RegistryStore) -> Result<()> {
        let path = self.store_path();
        std::fs::create_dir_all(&self.dir).map_err(|e| unreachable_store(&path, e))?;

        let temp = NamedTempFile::new_in(&self.dir).map_err(|e| unreachable_store(&path, e))?;
        temp.as_file()
            .lock_exclusive()
            .map_err(|e| unreachable_store(&path, e))?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(store)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved registry store to {:?}", path);
        Ok(())
    }

    fn append_transmission(&self, record: &TransmissionRecord) -> Result<()> {
        let path = self.transmissions_path();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;
        tracing::debug!("Logged transmission {}", record.id);
        Ok(())
    }
}

fn unreachable_store(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Connectivity(format!("registry store {:?} unavailable: {}", path, e))
}

/// Sixteen uppercase alphanumerics taken from a random UUID
fn generate_code() -> Result<PrescriptionCode> {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    PrescriptionCode::new(&hex[..16])
}

impl HealthRegistry for FileRegistry {
    fn fetch_history(&mut self, patient: &HealthCardId) -> Result<MedicalHistory> {
        let store = self.load_store()?;
        store
            .patients
            .get(patient)
            .map(|r| r.history.clone())
            .ok_or_else(|| Error::UnknownPatient(patient.clone()))
    }

    fn fetch_prescription(
        &mut self,
        patient: &HealthCardId,
        illness: &str,
    ) -> Result<MedicalPrescription> {
        let store = self.load_store()?;
        let record = store
            .patients
            .get(patient)
            .ok_or_else(|| Error::UnknownPatient(patient.clone()))?;

        record
            .prescriptions
            .get(illness)
            .cloned()
            .ok_or_else(|| Error::NoActivePrescription {
                patient: patient.clone(),
                illness: illness.to_string(),
            })
    }

    fn submit(
        &mut self,
        patient: &HealthCardId,
        history: &MedicalHistory,
        illness: &str,
        prescription: &MedicalPrescription,
    ) -> Result<MedicalPrescription> {
        let mut store = self.load_store()?;
        let record = store
            .patients
            .get_mut(patient)
            .ok_or_else(|| Error::UnknownPatient(patient.clone()))?;
        if !record.prescriptions.contains_key(illness) {
            return Err(Error::NoActivePrescription {
                patient: patient.clone(),
                illness: illness.to_string(),
            });
        }

        if prescription.signature().is_none() {
            return Err(Error::IncompletePrescription(
                "missing electronic signature".into(),
            ));
        }
        if prescription.prescription_date().is_none() || prescription.end_date().is_none() {
            return Err(Error::IncompletePrescription("missing treatment dates".into()));
        }

        let code = generate_code()?;
        let mut finalized = prescription.clone();
        finalized.set_issued_code(code.clone());

        record.history = history.clone();
        record
            .prescriptions
            .insert(illness.to_string(), finalized.clone());
        self.save_store(&store)?;

        // The store is authoritative once saved; the log is an audit trail
        let logged = self.append_transmission(&TransmissionRecord {
            id: Uuid::new_v4(),
            transmitted_at: Utc::now(),
            patient: patient.clone(),
            illness: illness.to_string(),
            code: code.clone(),
            prescription: finalized.clone(),
        });
        if let Err(e) = logged {
            tracing::warn!("Prescription {} registered but not logged: {}", code, e);
        }

        tracing::info!("Registered prescription {} for {}", code, patient);
        Ok(finalized)
    }
}

/// Read every record from a transmission log
///
/// Malformed lines are logged and skipped.
pub fn read_transmissions(path: &Path) -> Result<Vec<TransmissionRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<TransmissionRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse transmission at line {}: {}",
                    line_num + 1,
                    e
                );
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} transmissions", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DigitalSignature;
    use chrono::Duration;

    const PATIENT: &str = "1234567890123456";

    fn patient() -> HealthCardId {
        HealthCardId::new(PATIENT).unwrap()
    }

    fn completed(mut prescription: MedicalPrescription) -> MedicalPrescription {
        let now = Utc::now();
        prescription.set_dates(now, now + Duration::days(30));
        prescription.set_signature(DigitalSignature::new(b"doctor").unwrap());
        prescription
    }

    #[test]
    fn test_unknown_patient_on_empty_registry() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut registry = FileRegistry::new(temp_dir.path());

        assert!(matches!(
            registry.fetch_history(&patient()),
            Err(Error::UnknownPatient(_))
        ));
    }

    #[test]
    fn test_enroll_then_fetch() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut registry = FileRegistry::new(temp_dir.path());
        registry.enroll(&patient(), 12345, "Diabetes").unwrap();

        let history = registry.fetch_history(&patient()).unwrap();
        assert_eq!(history.membership_number(), 12345);

        let prescription = registry.fetch_prescription(&patient(), "Diabetes").unwrap();
        assert_eq!(prescription.illness(), "Diabetes");
        assert_eq!(prescription.line_count(), 0);

        assert!(matches!(
            registry.fetch_prescription(&patient(), "Asthma"),
            Err(Error::NoActivePrescription { .. })
        ));
    }

    #[test]
    fn test_enroll_keeps_existing_prescription() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut registry = FileRegistry::new(temp_dir.path());
        registry.enroll(&patient(), 1, "Diabetes").unwrap();

        let mut history = registry.fetch_history(&patient()).unwrap();
        history.add_annotation("first visit");
        let prescription = completed(registry.fetch_prescription(&patient(), "Diabetes").unwrap());
        registry
            .submit(&patient(), &history, "Diabetes", &prescription)
            .unwrap();

        registry.enroll(&patient(), 1, "Diabetes").unwrap();
        let again = registry.fetch_prescription(&patient(), "Diabetes").unwrap();
        assert!(again.issued_code().is_some());
        assert_eq!(
            registry.fetch_history(&patient()).unwrap().history(),
            "first visit\n"
        );
    }

    #[test]
    fn test_submit_rejects_incomplete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut registry = FileRegistry::new(temp_dir.path());
        registry.enroll(&patient(), 1, "Diabetes").unwrap();

        let history = registry.fetch_history(&patient()).unwrap();
        let prescription = registry.fetch_prescription(&patient(), "Diabetes").unwrap();

        assert!(matches!(
            registry.submit(&patient(), &history, "Diabetes", &prescription),
            Err(Error::IncompletePrescription(_))
        ));
        assert!(read_transmissions(&registry.transmissions_path())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_submit_assigns_code_and_logs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut registry = FileRegistry::new(temp_dir.path());
        registry.enroll(&patient(), 1, "Diabetes").unwrap();

        let history = registry.fetch_history(&patient()).unwrap();
        let prescription = completed(registry.fetch_prescription(&patient(), "Diabetes").unwrap());

        let finalized = registry
            .submit(&patient(), &history, "Diabetes", &prescription)
            .unwrap();
        let code = finalized.issued_code().unwrap().clone();
        assert_eq!(code.as_str().len(), 16);

        let log = read_transmissions(&registry.transmissions_path()).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].code, code);
        assert_eq!(log[0].illness, "Diabetes");
    }

    #[test]
    fn test_unwritable_log_keeps_registered_code() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut registry = FileRegistry::new(temp_dir.path());
        registry.enroll(&patient(), 1, "Diabetes").unwrap();

        // A directory in place of the log makes every append fail
        std::fs::create_dir(registry.transmissions_path()).unwrap();

        let history = registry.fetch_history(&patient()).unwrap();
        let prescription = completed(registry.fetch_prescription(&patient(), "Diabetes").unwrap());
        let finalized = registry
            .submit(&patient(), &history, "Diabetes", &prescription)
            .unwrap();

        let stored = registry.fetch_prescription(&patient(), "Diabetes").unwrap();
        assert_eq!(stored.issued_code(), finalized.issued_code());
        assert!(stored.issued_code().is_some());
    }

    #[test]
    fn test_corrupted_store_is_connectivity_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry_dir = temp_dir.path();
        std::fs::write(registry_dir.join(STORE_FILE), "{ invalid json }").unwrap();

        let mut registry = FileRegistry::new(registry_dir);
        assert!(matches!(
            registry.fetch_history(&patient()),
            Err(Error::Connectivity(_))
        ));
    }

    #[test]
    fn test_malformed_log_lines_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(TRANSMISSIONS_FILE);
        std::fs::write(&path, "not json\n\n").unwrap();

        assert!(read_transmissions(&path).unwrap().is_empty());
    }
}
