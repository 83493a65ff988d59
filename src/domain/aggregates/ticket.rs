//! Support ticket aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::Customer;
use crate::domain::value_objects::new_id;
use crate::domain::events::{DomainEvent, TicketEvent};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    id: String,
    subject: String,
    status: TicketStatus,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    customer: Customer,
    messages: Vec<Message>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)] pub struct Message { pub id: String, pub sender: Sender, pub text: String, pub timestamp: DateTime<Utc> }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender { Customer, Agent }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus { #[default] New, InProgress, Answered, Closed }

impl TicketStatus {
    pub fn is_open(&self) -> bool { *self != Self::Closed }
}

impl SupportTicket {
    pub fn open(subject: impl Into<String>, customer: Customer, text: impl Into<String>) -> Result<Self, TicketError> {
        let subject = subject.into();
        let text = text.into();
        if subject.trim().is_empty() { return Err(TicketError::EmptySubject); }
        if text.trim().is_empty() { return Err(TicketError::EmptyMessage); }
        let now = Utc::now();
        let mut ticket = Self {
            id: new_id("ticket"), subject: subject.trim().to_string(), status: TicketStatus::New, created_at: now, last_updated: now,
            customer, messages: vec![], events: vec![],
        };
        ticket.messages.push(Message { id: new_id("msg"), sender: Sender::Customer, text, timestamp: now });
        ticket.raise_event(DomainEvent::Ticket(TicketEvent::Opened { ticket_id: ticket.id.clone() }));
        Ok(ticket)
    }

    /// Sample tickets keep their fixed ids, status and thread.
    pub fn restore(id: impl Into<String>, subject: impl Into<String>, status: TicketStatus, customer: Customer, messages: Vec<Message>) -> Self {
        let created_at = messages.first().map_or_else(Utc::now, |m| m.timestamp);
        let last_updated = messages.last().map_or(created_at, |m| m.timestamp);
        Self { id: id.into(), subject: subject.into(), status, created_at, last_updated, customer, messages, events: vec![] }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn subject(&self) -> &str { &self.subject }
    pub fn status(&self) -> TicketStatus { self.status }
    pub fn customer(&self) -> &Customer { &self.customer }
    pub fn messages(&self) -> &[Message] { &self.messages }
    pub fn last_updated(&self) -> DateTime<Utc> { self.last_updated }

    pub fn matches(&self, search: &str) -> bool {
        let q = search.trim().to_lowercase();
        q.is_empty() || self.subject.to_lowercase().contains(&q) || self.customer.name.to_lowercase().contains(&q) || self.customer.email.to_lowercase().contains(&q)
    }

    /// Appends a message. An agent reply marks the ticket answered; a customer
    /// follow-up on an answered ticket puts it back in progress.
    pub fn post_message(&mut self, sender: Sender, text: impl Into<String>) -> Result<&Message, TicketError> {
        let text = text.into();
        if !self.status.is_open() { return Err(TicketError::Closed); }
        if text.trim().is_empty() { return Err(TicketError::EmptyMessage); }
        let message = Message { id: new_id("msg"), sender, text, timestamp: Utc::now() };
        let message_id = message.id.clone();
        self.messages.push(message);
        self.raise_event(DomainEvent::Ticket(TicketEvent::MessageAdded { ticket_id: self.id.clone(), message_id }));
        match (sender, self.status) {
            (Sender::Agent, _) => self.set_status(TicketStatus::Answered)?,
            (Sender::Customer, TicketStatus::Answered) => self.set_status(TicketStatus::InProgress)?,
            _ => self.touch(),
        }
        self.messages.last().ok_or(TicketError::EmptyMessage)
    }

    pub fn close(&mut self) -> Result<(), TicketError> { self.set_status(TicketStatus::Closed) }

    /// Explicit status change from the admin console. Closed tickets stay closed.
    pub fn set_status(&mut self, next: TicketStatus) -> Result<(), TicketError> {
        if self.status == next { return Ok(()); }
        if !self.status.is_open() { return Err(TicketError::Closed); }
        let from = self.status;
        self.status = next;
        self.touch();
        self.raise_event(DomainEvent::Ticket(TicketEvent::StatusChanged { ticket_id: self.id.clone(), from, to: next }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.last_updated = Utc::now(); }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TicketError {
    #[error("ticket subject is required")]
    EmptySubject,
    #[error("message text is required")]
    EmptyMessage,
    #[error("ticket is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket() -> SupportTicket {
        let customer = Customer { name: "Jane Smith".into(), email: "jane@example.com".into(), phone: None };
        SupportTicket::open("Order Delivery Delay", customer, "Where is my order?").unwrap()
    }

    #[test]
    fn test_open_ticket() {
        let t = ticket();
        assert_eq!(t.status(), TicketStatus::New);
        assert_eq!(t.messages().len(), 1);
        assert_eq!(t.messages()[0].sender, Sender::Customer);
        assert!(SupportTicket::open(" ", Customer::default(), "x").is_err());
    }

    #[test]
    fn test_reply_flow() {
        let mut t = ticket();
        t.post_message(Sender::Agent, "We are checking").unwrap();
        assert_eq!(t.status(), TicketStatus::Answered);
        t.post_message(Sender::Customer, "Any news?").unwrap();
        assert_eq!(t.status(), TicketStatus::InProgress);
        assert!(matches!(t.post_message(Sender::Agent, "   "), Err(TicketError::EmptyMessage)));
        assert_eq!(t.messages().len(), 3);
    }

    #[test]
    fn test_closed_ticket_rejects_messages() {
        let mut t = ticket();
        t.close().unwrap();
        assert!(matches!(t.post_message(Sender::Customer, "hello"), Err(TicketError::Closed)));
        assert!(t.set_status(TicketStatus::InProgress).is_err());
        assert!(t.close().is_ok());
    }

    #[test]
    fn test_matches() {
        let t = ticket();
        assert!(t.matches("delivery"));
        assert!(t.matches("JANE"));
        assert!(!t.matches("refund"));
    }
}
