//! API Router with Swagger UI
//!
//! Every `/api/v1` route group is wrapped in the auth gate and a role
//! gate with a statically configured allow-list. Where a resource mixes
//! permissions (read vs manage) the role gate is layered on the method
//! router instead of the whole group.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{AuditRecorder, UserService};
use crate::auth::{auth_middleware, require_role, AuthState, JwtConfig};
use crate::config::AppConfig;
use crate::domain::UserRole;
use crate::infrastructure::database::repositories::{AuditLogRepository, UserRepository};
use crate::interfaces::http::common::{ApiResponse, PaginatedResponse, PaginationParams};
use crate::interfaces::http::modules::{
    appointments, audit, auth as auth_api, health, inventory, invoices, lab_tests, patients,
    prescriptions, request_id, users, SharedAudit,
};

// Role allow-lists, one per route group. The role gate is a plain
// set-membership check against these.
const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];
const PATIENT_READ: &[UserRole] = &[
    UserRole::Admin,
    UserRole::Receptionist,
    UserRole::Doctor,
    UserRole::Nurse,
];
const PATIENT_MANAGE: &[UserRole] = &[UserRole::Admin, UserRole::Receptionist];
const APPOINTMENT_READ: &[UserRole] = &[
    UserRole::Admin,
    UserRole::Receptionist,
    UserRole::Doctor,
    UserRole::Nurse,
    UserRole::Patient,
];
const APPOINTMENT_BOOK: &[UserRole] = &[
    UserRole::Admin,
    UserRole::Receptionist,
    UserRole::Patient,
];
const APPOINTMENT_PROGRESS: &[UserRole] =
    &[UserRole::Admin, UserRole::Doctor, UserRole::Nurse];
const PRESCRIPTION_READ: &[UserRole] = &[
    UserRole::Admin,
    UserRole::Doctor,
    UserRole::Nurse,
    UserRole::Pharmacist,
];
const PRESCRIPTION_WRITE: &[UserRole] = &[UserRole::Admin, UserRole::Doctor];
const PRESCRIPTION_DISPENSE: &[UserRole] = &[UserRole::Pharmacist];
const LAB_READ: &[UserRole] = &[
    UserRole::Admin,
    UserRole::Doctor,
    UserRole::Nurse,
    UserRole::LabTechnician,
];
const LAB_ORDER: &[UserRole] = &[UserRole::Admin, UserRole::Doctor];
const LAB_PROCESS: &[UserRole] = &[UserRole::LabTechnician];
const INVOICE_MANAGE: &[UserRole] = &[UserRole::Admin, UserRole::Receptionist];
const INVENTORY_MANAGE: &[UserRole] = &[UserRole::Admin, UserRole::Pharmacist];

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token (also accepted via session cookie)"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::handlers::health_check,
        // Auth
        auth_api::handlers::login,
        auth_api::handlers::register,
        auth_api::handlers::logout,
        auth_api::handlers::get_current_user,
        auth_api::handlers::change_password,
        // Users
        users::handlers::list_users,
        users::handlers::get_user,
        users::handlers::create_user,
        users::handlers::update_user,
        users::handlers::deactivate_user,
        users::handlers::reactivate_user,
        // Patients
        patients::handlers::list_patients,
        patients::handlers::get_patient,
        patients::handlers::create_patient,
        patients::handlers::update_patient,
        patients::handlers::delete_patient,
        // Appointments
        appointments::handlers::list_appointments,
        appointments::handlers::get_appointment,
        appointments::handlers::create_appointment,
        appointments::handlers::update_appointment,
        appointments::handlers::update_appointment_status,
        // Prescriptions
        prescriptions::handlers::list_prescriptions,
        prescriptions::handlers::get_prescription,
        prescriptions::handlers::create_prescription,
        prescriptions::handlers::dispense_prescription,
        prescriptions::handlers::cancel_prescription,
        // Lab tests
        lab_tests::handlers::list_lab_tests,
        lab_tests::handlers::get_lab_test,
        lab_tests::handlers::order_lab_test,
        lab_tests::handlers::start_lab_test,
        lab_tests::handlers::complete_lab_test,
        lab_tests::handlers::cancel_lab_test,
        // Invoices
        invoices::handlers::list_invoices,
        invoices::handlers::get_invoice,
        invoices::handlers::create_invoice,
        invoices::handlers::issue_invoice,
        invoices::handlers::pay_invoice,
        invoices::handlers::cancel_invoice,
        // Inventory
        inventory::handlers::list_inventory,
        inventory::handlers::list_low_stock,
        inventory::handlers::get_inventory_item,
        inventory::handlers::create_inventory_item,
        inventory::handlers::update_inventory_item,
        inventory::handlers::adjust_stock,
        inventory::handlers::deactivate_inventory_item,
        // Audit
        audit::handlers::list_audit_logs,
    ),
    components(
        schemas(
            // Common
            ApiResponse<String>,
            PaginatedResponse<patients::PatientDto>,
            PaginationParams,
            // Health
            health::HealthResponse,
            health::ComponentHealth,
            // Auth
            auth_api::LoginRequest,
            auth_api::LoginResponse,
            auth_api::RegisterRequest,
            auth_api::ChangePasswordRequest,
            auth_api::UserInfo,
            // Users
            users::UserDto,
            users::CreateUserRequest,
            users::UpdateUserRequest,
            // Patients
            patients::PatientDto,
            patients::CreatePatientRequest,
            patients::UpdatePatientRequest,
            // Appointments
            appointments::AppointmentDto,
            appointments::CreateAppointmentRequest,
            appointments::UpdateAppointmentRequest,
            appointments::UpdateAppointmentStatusRequest,
            // Prescriptions
            prescriptions::PrescriptionDto,
            prescriptions::PrescriptionItem,
            prescriptions::CreatePrescriptionRequest,
            prescriptions::DispenseResponse,
            // Lab tests
            lab_tests::LabTestDto,
            lab_tests::OrderLabTestRequest,
            lab_tests::CompleteLabTestRequest,
            // Invoices
            invoices::InvoiceDto,
            invoices::InvoiceItem,
            invoices::CreateInvoiceRequest,
            // Inventory
            inventory::InventoryItemDto,
            inventory::CreateInventoryItemRequest,
            inventory::UpdateInventoryItemRequest,
            inventory::AdjustStockRequest,
            // Audit
            audit::AuditRecordDto,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Authentication", description = "Login (JWT + session cookie), registration, password change"),
        (name = "Users", description = "Staff and patient account administration"),
        (name = "Patients", description = "Patient demographics and assignment"),
        (name = "Appointments", description = "Appointment booking and status lifecycle"),
        (name = "Prescriptions", description = "Prescriptions and pharmacy dispensing"),
        (name = "Lab Tests", description = "Lab test orders and results"),
        (name = "Invoices", description = "Billing invoices"),
        (name = "Inventory", description = "Pharmacy inventory and stock adjustments"),
        (name = "Audit", description = "Append-only audit trail (admin)"),
    ),
    info(
        title = "CareFlow HMS API",
        version = "1.0.0",
        description = "REST API for hospital management: patients, appointments, prescriptions, labs, billing and inventory",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(db: DatabaseConnection, config: &AppConfig) -> Router {
    let jwt_config = JwtConfig::new(
        config.security.jwt_secret.clone(),
        config.security.jwt_expiration_hours,
    );

    let auth_state = AuthState {
        jwt_config: jwt_config.clone(),
        db: db.clone(),
    };

    let user_service = Arc::new(UserService::new(
        Arc::new(UserRepository::new(db.clone())),
        jwt_config,
    ));
    let shared_audit: SharedAudit = Arc::new(AuditRecorder::new(Arc::new(
        AuditLogRepository::new(db.clone()),
    )));

    // ── Auth ────────────────────────────────────────────────────
    let auth_handler_state = auth_api::AuthHandlerState {
        user_service: user_service.clone(),
        audit: shared_audit.clone(),
        cookie_secure: config.security.cookie_secure,
        token_expiration_hours: config.security.jwt_expiration_hours,
    };

    let auth_public_routes = Router::new()
        .route("/login", post(auth_api::login))
        .route("/register", post(auth_api::register))
        .with_state(auth_handler_state.clone());

    let auth_protected_routes = Router::new()
        .route("/logout", post(auth_api::logout))
        .route("/me", get(auth_api::get_current_user))
        .route("/change-password", post(auth_api::change_password))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(auth_handler_state);

    // ── Users (admin) ───────────────────────────────────────────
    let user_state = users::UserHandlerState {
        user_service,
        audit: shared_audit.clone(),
    };
    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/{id}", get(users::get_user).put(users::update_user))
        .route("/{id}/deactivate", post(users::deactivate_user))
        .route("/{id}/reactivate", post(users::reactivate_user))
        .layer(middleware::from_fn_with_state(ADMIN_ONLY, require_role))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(user_state);

    // ── Patients ────────────────────────────────────────────────
    // Clinical staff read; admin and reception manage. The role gate
    // is layered per method router where the permissions differ.
    let patient_state = patients::PatientHandlerState {
        db: db.clone(),
        audit: shared_audit.clone(),
    };
    let patient_routes = Router::new()
        .route(
            "/",
            get(patients::list_patients)
                .layer(middleware::from_fn_with_state(PATIENT_READ, require_role)),
        )
        .route(
            "/",
            post(patients::create_patient)
                .layer(middleware::from_fn_with_state(PATIENT_MANAGE, require_role)),
        )
        .route(
            "/{id}",
            get(patients::get_patient)
                .layer(middleware::from_fn_with_state(PATIENT_READ, require_role)),
        )
        .route(
            "/{id}",
            put(patients::update_patient)
                .delete(patients::delete_patient)
                .layer(middleware::from_fn_with_state(PATIENT_MANAGE, require_role)),
        )
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(patient_state);

    // ── Appointments ────────────────────────────────────────────
    let appointment_state = appointments::AppointmentHandlerState {
        db: db.clone(),
        audit: shared_audit.clone(),
    };
    let appointment_routes = Router::new()
        .route(
            "/",
            get(appointments::list_appointments).layer(middleware::from_fn_with_state(
                APPOINTMENT_READ,
                require_role,
            )),
        )
        .route(
            "/",
            post(appointments::create_appointment).layer(middleware::from_fn_with_state(
                APPOINTMENT_BOOK,
                require_role,
            )),
        )
        .route(
            "/{id}",
            get(appointments::get_appointment).layer(middleware::from_fn_with_state(
                APPOINTMENT_READ,
                require_role,
            )),
        )
        .route(
            "/{id}",
            put(appointments::update_appointment).layer(middleware::from_fn_with_state(
                APPOINTMENT_BOOK,
                require_role,
            )),
        )
        .route(
            "/{id}/status",
            put(appointments::update_appointment_status).layer(middleware::from_fn_with_state(
                APPOINTMENT_PROGRESS,
                require_role,
            )),
        )
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(appointment_state);

    // ── Prescriptions ───────────────────────────────────────────
    let prescription_state = prescriptions::PrescriptionHandlerState {
        db: db.clone(),
        audit: shared_audit.clone(),
    };
    let prescription_routes = Router::new()
        .route(
            "/",
            get(prescriptions::list_prescriptions).layer(middleware::from_fn_with_state(
                PRESCRIPTION_READ,
                require_role,
            )),
        )
        .route(
            "/",
            post(prescriptions::create_prescription).layer(middleware::from_fn_with_state(
                PRESCRIPTION_WRITE,
                require_role,
            )),
        )
        .route(
            "/{id}",
            get(prescriptions::get_prescription).layer(middleware::from_fn_with_state(
                PRESCRIPTION_READ,
                require_role,
            )),
        )
        .route(
            "/{id}/cancel",
            post(prescriptions::cancel_prescription).layer(middleware::from_fn_with_state(
                PRESCRIPTION_WRITE,
                require_role,
            )),
        )
        .route(
            "/{id}/dispense",
            post(prescriptions::dispense_prescription).layer(middleware::from_fn_with_state(
                PRESCRIPTION_DISPENSE,
                require_role,
            )),
        )
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(prescription_state);

    // ── Lab tests ───────────────────────────────────────────────
    let lab_state = lab_tests::LabTestHandlerState {
        db: db.clone(),
        audit: shared_audit.clone(),
    };
    let lab_routes = Router::new()
        .route(
            "/",
            get(lab_tests::list_lab_tests)
                .layer(middleware::from_fn_with_state(LAB_READ, require_role)),
        )
        .route(
            "/",
            post(lab_tests::order_lab_test)
                .layer(middleware::from_fn_with_state(LAB_ORDER, require_role)),
        )
        .route(
            "/{id}",
            get(lab_tests::get_lab_test)
                .layer(middleware::from_fn_with_state(LAB_READ, require_role)),
        )
        .route(
            "/{id}/cancel",
            post(lab_tests::cancel_lab_test)
                .layer(middleware::from_fn_with_state(LAB_ORDER, require_role)),
        )
        .route(
            "/{id}/start",
            post(lab_tests::start_lab_test)
                .layer(middleware::from_fn_with_state(LAB_PROCESS, require_role)),
        )
        .route(
            "/{id}/complete",
            post(lab_tests::complete_lab_test)
                .layer(middleware::from_fn_with_state(LAB_PROCESS, require_role)),
        )
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(lab_state);

    // ── Invoices ────────────────────────────────────────────────
    let invoice_state = invoices::InvoiceHandlerState {
        db: db.clone(),
        audit: shared_audit.clone(),
    };
    let invoice_routes = Router::new()
        .route(
            "/",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route("/{id}", get(invoices::get_invoice))
        .route("/{id}/issue", post(invoices::issue_invoice))
        .route("/{id}/pay", post(invoices::pay_invoice))
        .route("/{id}/cancel", post(invoices::cancel_invoice))
        .layer(middleware::from_fn_with_state(INVOICE_MANAGE, require_role))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(invoice_state);

    // ── Inventory ───────────────────────────────────────────────
    let inventory_state = inventory::InventoryHandlerState {
        db: db.clone(),
        audit: shared_audit.clone(),
    };
    let inventory_routes = Router::new()
        .route(
            "/",
            get(inventory::list_inventory).post(inventory::create_inventory_item),
        )
        .route("/low-stock", get(inventory::list_low_stock))
        .route(
            "/{id}",
            get(inventory::get_inventory_item)
                .put(inventory::update_inventory_item)
                .delete(inventory::deactivate_inventory_item),
        )
        .route("/{id}/adjust-stock", post(inventory::adjust_stock))
        .layer(middleware::from_fn_with_state(
            INVENTORY_MANAGE,
            require_role,
        ))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(inventory_state);

    // ── Audit (admin, read-only) ────────────────────────────────
    let audit_routes = Router::new()
        .route("/", get(audit::list_audit_logs))
        .layer(middleware::from_fn_with_state(ADMIN_ONLY, require_role))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(audit::AuditHandlerState {
            audit: shared_audit,
        });

    // ── Health (public) ─────────────────────────────────────────
    let health_state = health::HealthState {
        db,
        started_at: Arc::new(Instant::now()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        // Swagger UI
        .merge(swagger_routes)
        // Health
        .route("/health", get(health::health_check).with_state(health_state))
        // Auth
        .nest("/api/v1/auth", auth_public_routes)
        .nest("/api/v1/auth", auth_protected_routes)
        // Users
        .nest("/api/v1/users", user_routes)
        // Patients
        .nest("/api/v1/patients", patient_routes)
        // Appointments
        .nest("/api/v1/appointments", appointment_routes)
        // Prescriptions
        .nest("/api/v1/prescriptions", prescription_routes)
        // Lab tests
        .nest("/api/v1/lab-tests", lab_routes)
        // Invoices
        .nest("/api/v1/invoices", invoice_routes)
        // Inventory
        .nest("/api/v1/inventory", inventory_routes)
        // Audit
        .nest("/api/v1/audit-logs", audit_routes)
        // Middleware
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
