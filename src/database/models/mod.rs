pub mod organization;
pub mod ticket;
pub mod user;

pub use organization::{NewOrganization, Organization, OrganizationPatch};
pub use ticket::{NewTicket, Ticket, TicketAssignment, TicketFilter, TicketPatch, TicketStats};
pub use user::{NewUser, User};
