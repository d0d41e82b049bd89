pub mod role_gate;

pub use role_gate::{gate_knowledge_routes, role_gate_middleware, KNOWLEDGE_ADMIN_ROUTES};
