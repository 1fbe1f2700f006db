//! Records of the Nagios `status.dat` file

use once_cell::sync::Lazy;
use serde::Serialize;

use super::schema::{Document, Schema};
use super::values::{
    AcknowledgementType, CheckType, HostState, ModifiedAttributes, ServiceState, StateType,
};
use crate::xdata_record;

xdata_record! {
    /// Version information about the Nagios instance
    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct Info {
        pub created: i64,
        pub version: String,
        pub last_update_check: i64,
        pub update_available: bool,
        pub last_version: String,
        pub new_version: String,
    }
}

xdata_record! {
    /// Global state of the Nagios process
    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct ProgramStatus {
        pub modified_host_attributes: ModifiedAttributes,
        pub modified_service_attributes: ModifiedAttributes,
        pub nagios_pid: i64,
        pub daemon_mode: bool,
        pub program_start: i64,
        pub last_log_rotation: i64,
        pub enable_notifications: bool,
        pub active_service_checks_enabled: bool,
        pub passive_service_checks_enabled: bool,
        pub active_host_checks_enabled: bool,
        pub passive_host_checks_enabled: bool,
        pub enable_event_handlers: bool,
        pub obsess_over_services: bool,
        pub obsess_over_hosts: bool,
        pub check_service_freshness: bool,
        pub check_host_freshness: bool,
        pub enable_flap_detection: bool,
        pub process_performance_data: bool,
        pub global_host_event_handler: String,
        pub global_service_event_handler: String,
        pub next_comment_id: i64,
        pub next_downtime_id: i64,
        pub next_event_id: i64,
        pub next_problem_id: i64,
        pub next_notification_id: i64,
        pub active_scheduled_host_check_stats: String,
        pub active_ondemand_host_check_stats: String,
        pub passive_host_check_stats: String,
        pub active_scheduled_service_check_stats: String,
        pub active_ondemand_service_check_stats: String,
        pub passive_service_check_stats: String,
        pub cached_host_check_stats: String,
        pub cached_service_check_stats: String,
        pub external_command_stats: String,
        pub parallel_host_check_stats: String,
        pub serial_host_check_stats: String,
    }
}

xdata_record! {
    /// Latest check result and scheduling state of a host
    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct HostStatus {
        pub host_name: String,
        pub modified_attributes: ModifiedAttributes,
        pub check_command: String,
        pub check_period: String,
        pub notification_period: String,
        pub check_interval: f64,
        pub retry_interval: f64,
        pub event_handler: String,
        pub has_been_checked: bool,
        pub should_be_scheduled: bool,
        pub check_execution_time: f64,
        pub check_latency: f64,
        pub check_type: CheckType,
        pub current_state: HostState,
        pub last_hard_state: HostState,
        pub last_event_id: i64,
        pub current_event_id: i64,
        pub current_problem_id: i64,
        pub last_problem_id: i64,
        pub plugin_output: String,
        pub long_plugin_output: String,
        pub performance_data: String,
        pub last_check: i64,
        pub next_check: i64,
        pub check_options: i64,
        pub current_attempt: i64,
        pub max_attempts: i64,
        pub state_type: StateType,
        pub last_state_change: i64,
        pub last_hard_state_change: i64,
        pub last_time_up: i64,
        pub last_time_down: i64,
        pub last_time_unreachable: i64,
        pub last_notification: i64,
        pub next_notification: i64,
        pub no_more_notifications: bool,
        pub current_notification_number: i64,
        pub current_notification_id: i64,
        pub notifications_enabled: bool,
        pub problem_has_been_acknowledged: bool,
        pub acknowledgement_type: AcknowledgementType,
        pub active_checks_enabled: bool,
        pub passive_checks_enabled: bool,
        pub event_handler_enabled: bool,
        pub flap_detection_enabled: bool,
        pub process_performance_data: bool,
        pub obsess: bool,
        pub last_update: i64,
        pub is_flapping: bool,
        pub percent_state_change: f64,
        pub scheduled_downtime_depth: i64,
    }
}

xdata_record! {
    /// Latest check result and scheduling state of a service
    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct ServiceStatus {
        pub host_name: String,
        pub service_description: String,
        pub modified_attributes: ModifiedAttributes,
        pub check_command: String,
        pub check_period: String,
        pub notification_period: String,
        pub check_interval: f64,
        pub retry_interval: f64,
        pub event_handler: String,
        pub has_been_checked: bool,
        pub should_be_scheduled: bool,
        pub check_execution_time: f64,
        pub check_latency: f64,
        pub check_type: CheckType,
        pub current_state: ServiceState,
        pub last_hard_state: ServiceState,
        pub last_event_id: i64,
        pub current_event_id: i64,
        pub current_problem_id: i64,
        pub last_problem_id: i64,
        pub current_attempt: i64,
        pub max_attempts: i64,
        pub state_type: StateType,
        pub last_state_change: i64,
        pub last_hard_state_change: i64,
        pub last_time_ok: i64,
        pub last_time_warning: i64,
        pub last_time_unknown: i64,
        pub last_time_critical: i64,
        pub plugin_output: String,
        pub long_plugin_output: String,
        pub performance_data: String,
        pub last_check: i64,
        pub next_check: i64,
        pub check_options: i64,
        pub current_notification_number: i64,
        pub current_notification_id: i64,
        pub last_notification: i64,
        pub next_notification: i64,
        pub no_more_notifications: bool,
        pub notifications_enabled: bool,
        pub active_checks_enabled: bool,
        pub passive_checks_enabled: bool,
        pub event_handler_enabled: bool,
        pub problem_has_been_acknowledged: bool,
        pub acknowledgement_type: AcknowledgementType,
        pub flap_detection_enabled: bool,
        pub process_performance_data: bool,
        pub obsess: bool,
        pub last_update: i64,
        pub is_flapping: bool,
        pub percent_state_change: f64,
        pub scheduled_downtime_depth: i64,
    }
}

xdata_record! {
    /// Comment attached to a host
    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct HostComment {
        pub host_name: String,
        pub entry_type: i64,
        pub comment_id: i64,
        pub source: i64,
        pub persistent: bool,
        pub entry_time: i64,
        pub expires: bool,
        pub expire_time: i64,
        pub author: String,
        pub comment_data: String,
    }
}

xdata_record! {
    /// Comment attached to a service
    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct ServiceComment {
        pub host_name: String,
        pub service_description: String,
        pub entry_type: i64,
        pub comment_id: i64,
        pub source: i64,
        pub persistent: bool,
        pub entry_time: i64,
        pub expires: bool,
        pub expire_time: i64,
        pub author: String,
        pub comment_data: String,
    }
}

xdata_record! {
    /// Notification state of a contact
    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct ContactStatus {
        pub contact_name: String,
        pub modified_attributes: ModifiedAttributes,
        pub modified_host_attributes: ModifiedAttributes,
        pub modified_service_attributes: ModifiedAttributes,
        pub host_notification_period: String,
        pub service_notification_period: String,
        pub last_host_notification: i64,
        pub last_service_notification: i64,
        pub host_notifications_enabled: bool,
        pub service_notifications_enabled: bool,
    }
}

/// Complete contents of a `status.dat` file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Status {
    pub info: Option<Info>,
    pub program_status: Option<ProgramStatus>,
    pub host_status: Vec<HostStatus>,
    pub host_comment: Vec<HostComment>,
    pub service_status: Vec<ServiceStatus>,
    pub service_comment: Vec<ServiceComment>,
    pub contact_status: Vec<ContactStatus>,
}

static STATUS_SCHEMA: Lazy<Schema<Status>> = Lazy::new(|| {
    Schema::builder()
        .single("info", |doc: &mut Status| &mut doc.info)
        .single("programstatus", |doc: &mut Status| &mut doc.program_status)
        .repeated("hoststatus", |doc: &mut Status| &mut doc.host_status)
        .repeated("hostcomment", |doc: &mut Status| &mut doc.host_comment)
        .repeated("servicestatus", |doc: &mut Status| &mut doc.service_status)
        .repeated("servicecomment", |doc: &mut Status| &mut doc.service_comment)
        .repeated("contactstatus", |doc: &mut Status| &mut doc.contact_status)
        .build()
});

impl Document for Status {
    fn schema() -> &'static Schema<Self> {
        &STATUS_SCHEMA
    }
}
