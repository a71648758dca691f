//! Ticket model.
//!
//! Tickets come back from `TicketGet` with every schema field populated
//! and go out in `TicketCreate`/`TicketUpdate` with only the fields the
//! caller set. Numeric schema fields are coerced from text on the way in;
//! blank elements such as `<SLAID/>` leave the field unset.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::{expect_name, Article, DynamicField, ExtraFields, FieldValue, XmlObject};
use crate::error::OtrsError;
use crate::xml::Element;

/// A support ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ticket {
    /// Unique ticket ID.
    pub ticket_id: Option<i64>,
    /// Human-facing ticket number. Kept as text: number generators may
    /// produce leading zeros.
    pub ticket_number: Option<String>,
    pub title: Option<String>,
    /// Seconds since creation.
    pub age: Option<i64>,
    pub archive_flag: Option<String>,
    pub change_by: Option<i64>,
    pub changed: Option<String>,
    pub create_by: Option<i64>,
    pub create_time_unix: Option<i64>,
    pub created: Option<String>,
    pub customer_id: Option<String>,
    /// Customer user login; set this on create.
    pub customer_user: Option<String>,
    /// Customer user login as reported by `TicketGet`.
    pub customer_user_id: Option<String>,
    pub escalation_response_time: Option<i64>,
    pub escalation_solution_time: Option<i64>,
    pub escalation_time: Option<i64>,
    pub escalation_update_time: Option<i64>,
    pub group_id: Option<i64>,
    pub lock: Option<String>,
    pub lock_id: Option<i64>,
    pub owner: Option<String>,
    pub owner_id: Option<i64>,
    pub priority: Option<String>,
    pub priority_id: Option<i64>,
    pub queue: Option<String>,
    pub queue_id: Option<i64>,
    pub real_till_time_not_used: Option<i64>,
    pub responsible: Option<String>,
    pub responsible_id: Option<i64>,
    pub sla: Option<String>,
    pub sla_id: Option<i64>,
    pub service: Option<String>,
    pub service_id: Option<i64>,
    pub state: Option<String>,
    pub state_id: Option<i64>,
    /// State category: `new`, `open`, `closed`, `pending reminder`, ...
    pub state_type: Option<String>,
    /// Ticket type name.
    pub type_name: Option<String>,
    pub type_id: Option<i64>,
    pub unlock_timeout: Option<i64>,
    pub until_time: Option<i64>,
    /// Articles, present when `TicketGet` was asked for them.
    pub articles: Vec<Article>,
    /// Ticket dynamic fields.
    pub dynamic_fields: Vec<DynamicField>,
    /// Unrecognised scalar elements, read through [`FieldValue::autocast`].
    pub extra: ExtraFields,
    /// Unrecognised elements with children, kept verbatim.
    pub nested: Vec<Element>,
}

named_fields!(Ticket {
    age: int = "Age",
    archive_flag: text = "ArchiveFlag",
    change_by: int = "ChangeBy",
    changed: text = "Changed",
    create_by: int = "CreateBy",
    create_time_unix: int = "CreateTimeUnix",
    created: text = "Created",
    customer_id: text = "CustomerID",
    customer_user: text = "CustomerUser",
    customer_user_id: text = "CustomerUserID",
    escalation_response_time: int = "EscalationResponseTime",
    escalation_solution_time: int = "EscalationSolutionTime",
    escalation_time: int = "EscalationTime",
    escalation_update_time: int = "EscalationUpdateTime",
    group_id: int = "GroupID",
    lock: text = "Lock",
    lock_id: int = "LockID",
    owner: text = "Owner",
    owner_id: int = "OwnerID",
    priority: text = "Priority",
    priority_id: int = "PriorityID",
    queue: text = "Queue",
    queue_id: int = "QueueID",
    real_till_time_not_used: int = "RealTillTimeNotUsed",
    responsible: text = "Responsible",
    responsible_id: int = "ResponsibleID",
    sla: text = "SLA",
    sla_id: int = "SLAID",
    service: text = "Service",
    service_id: int = "ServiceID",
    state: text = "State",
    state_id: int = "StateID",
    state_type: text = "StateType",
    ticket_id: int = "TicketID",
    ticket_number: text = "TicketNumber",
    title: text = "Title",
    type_name: text = "Type",
    type_id: int = "TypeID",
    unlock_timeout: int = "UnlockTimeout",
    until_time: int = "UntilTime",
});

impl Ticket {
    /// Creates an empty ticket. Use the `with_*` builders to fill it.
    ///
    /// # Example
    ///
    /// ```
    /// use otrs::models::Ticket;
    ///
    /// let ticket = Ticket::new()
    ///     .with_title("Problem test")
    ///     .with_queue("Support")
    ///     .with_state("new")
    ///     .with_priority("3 normal")
    ///     .with_customer_user("foo@example.com");
    /// assert_eq!(ticket.queue.as_deref(), Some("Support"));
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ticket from `(XML name, raw value)` pairs, coercing each.
    ///
    /// ```
    /// use otrs::models::Ticket;
    ///
    /// let ticket = Ticket::from_fields([("TicketID", "42"), ("EscalationResponseTime", "43")]).unwrap();
    /// assert_eq!(ticket.ticket_id, Some(42));
    /// assert_eq!(ticket.escalation_response_time, Some(43));
    /// ```
    pub fn from_fields<'a, I>(fields: I) -> Result<Self, OtrsError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut ticket = Ticket::default();
        for (name, raw) in fields {
            ticket.set(name, raw)?;
        }
        Ok(ticket)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    pub fn with_queue_id(mut self, queue_id: i64) -> Self {
        self.queue_id = Some(queue_id);
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_state_id(mut self, state_id: i64) -> Self {
        self.state_id = Some(state_id);
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn with_priority_id(mut self, priority_id: i64) -> Self {
        self.priority_id = Some(priority_id);
        self
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_customer_user(mut self, customer_user: impl Into<String>) -> Self {
        self.customer_user = Some(customer_user.into());
        self
    }

    pub fn with_customer_id(mut self, customer_id: impl ToString) -> Self {
        self.customer_id = Some(customer_id.to_string());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_responsible(mut self, responsible: impl Into<String>) -> Self {
        self.responsible = Some(responsible.into());
        self
    }

    pub fn with_lock(mut self, lock: impl Into<String>) -> Self {
        self.lock = Some(lock.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_sla(mut self, sla: impl Into<String>) -> Self {
        self.sla = Some(sla.into());
        self
    }

    /// Sets a field by XML name with coercion.
    ///
    /// Numeric schema fields accept numeric text (`"43"` becomes `43`) and
    /// reject anything else. Names outside the schema are stored as extra
    /// fields.
    ///
    /// # Errors
    ///
    /// Returns `OtrsError::InvalidField` when a numeric field gets text.
    pub fn set(&mut self, name: &str, raw: &str) -> Result<(), OtrsError> {
        if !self.set_named(name, raw)? {
            self.extra.set(name, raw);
        }
        Ok(())
    }

    /// Returns a field by XML name, schema fields first, then extras.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.get_named(name).or_else(|| self.extra.get(name))
    }

    /// Returns true if no scalar field, article or dynamic field is set.
    pub fn is_empty(&self) -> bool {
        Self::FIELD_NAMES.iter().all(|name| self.get_named(name).is_none())
            && self.extra.is_empty()
            && self.nested.is_empty()
            && self.articles.is_empty()
            && self.dynamic_fields.is_empty()
    }

    /// Returns the dynamic field with the given name.
    pub fn dynamic_field(&self, name: &str) -> Option<&DynamicField> {
        self.dynamic_fields.iter().find(|f| f.name == name)
    }
}

impl XmlObject for Ticket {
    const XML_NAME: &'static str = "Ticket";

    fn from_element(element: &Element) -> Result<Self, OtrsError> {
        expect_name(element, Self::XML_NAME)?;
        let mut ticket = Ticket::default();
        for child in &element.children {
            match child.name.as_str() {
                "Article" => ticket.articles.push(Article::from_element(child)?),
                "DynamicField" => ticket.dynamic_fields.push(DynamicField::from_element(child)?),
                _ if !child.children.is_empty() => ticket.nested.push(child.clone()),
                _ => {
                    if let Some(text) = &child.text {
                        ticket.set_unmarshalled(&child.name, text);
                    }
                }
            }
        }
        Ok(ticket)
    }

    fn to_element(&self) -> Element {
        let mut element = Element::new(Self::XML_NAME);
        self.push_named(&mut element);
        self.extra.write_into(&mut element);
        for nested in &self.nested {
            element.push(nested.clone());
        }
        for field in &self.dynamic_fields {
            element.push(field.to_element());
        }
        for article in &self.articles {
            element.push(article.to_element());
        }
        element
    }
}

impl Serialize for Ticket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.serialize_named(&mut map)?;
        for (name, value) in self.extra.iter() {
            map.serialize_entry(name, &value)?;
        }
        if !self.dynamic_fields.is_empty() {
            map.serialize_entry("DynamicField", &self.dynamic_fields)?;
        }
        if !self.articles.is_empty() {
            map.serialize_entry("Article", &self.articles)?;
        }
        map.end()
    }
}
