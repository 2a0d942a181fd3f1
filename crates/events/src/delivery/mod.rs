//! External delivery channels outside the realtime/push pair.

pub mod email;
