use std::{any::type_name_of_val, fmt, sync::Arc};

use cohort_model::{
    AdmissionConfirmation, Payment, StudentEnrollment, StudentId,
};

use crate::{
    database::ports::{
        admissions::AdmissionRepository, payments::PaymentRepository,
        students::StudentRepository,
    },
    error::Result,
};

#[derive(Debug, Clone)]
pub struct EnrollmentOverview {
    pub enrollment: StudentEnrollment,
    pub active_payment: Option<Payment>,
    pub confirmation: Option<AdmissionConfirmation>,
}

/// Read model behind `GET /enrollment/status`.
#[derive(Clone)]
pub struct EnrollmentQuery {
    students: Arc<dyn StudentRepository>,
    payments: Arc<dyn PaymentRepository>,
    admissions: Arc<dyn AdmissionRepository>,
}

impl fmt::Debug for EnrollmentQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrollmentQuery")
            .field("students", &type_name_of_val(self.students.as_ref()))
            .field("payments", &type_name_of_val(self.payments.as_ref()))
            .field("admissions", &type_name_of_val(self.admissions.as_ref()))
            .finish()
    }
}

impl EnrollmentQuery {
    pub fn new(
        students: Arc<dyn StudentRepository>,
        payments: Arc<dyn PaymentRepository>,
        admissions: Arc<dyn AdmissionRepository>,
    ) -> Self {
        Self {
            students,
            payments,
            admissions,
        }
    }

    pub async fn overview(&self, student_id: StudentId) -> Result<EnrollmentOverview> {
        let enrollment = self.students.get_enrollment(student_id).await?;
        let active_payment =
            self.payments.find_active_for_student(student_id).await?;
        let confirmation =
            self.admissions.latest_for_student(student_id).await?;

        Ok(EnrollmentOverview {
            enrollment,
            active_payment,
            confirmation,
        })
    }
}
