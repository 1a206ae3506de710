use super::ISubjectRepo;
use crate::repos::shared::{inmemory_repo::*, repo::DeleteResult};
use obligations_domain::{Subject, SubjectKind, ID};

pub struct InMemorySubjectRepo {
    kind: SubjectKind,
    subjects: std::sync::Mutex<Vec<Subject>>,
}

impl InMemorySubjectRepo {
    pub fn new(kind: SubjectKind) -> Self {
        Self {
            kind,
            subjects: std::sync::Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl ISubjectRepo for InMemorySubjectRepo {
    async fn insert(&self, subject: &Subject) -> anyhow::Result<()> {
        if subject.kind != self.kind {
            anyhow::bail!(
                "Cannot store a {} in the {} repository",
                subject.kind,
                self.kind
            );
        }
        insert(subject, &self.subjects);
        Ok(())
    }

    async fn find_one(&self, subject_id: &ID, tenant_id: &str) -> anyhow::Result<Option<Subject>> {
        let mut subjects = find_by(&self.subjects, |s| {
            s.id == *subject_id && s.tenant_id == tenant_id
        });
        if subjects.is_empty() {
            return Ok(None);
        }
        Ok(Some(subjects.remove(0)))
    }

    async fn delete(&self, subject_id: &ID) -> anyhow::Result<DeleteResult> {
        Ok(delete_by(&self.subjects, |s| s.id == *subject_id))
    }
}
