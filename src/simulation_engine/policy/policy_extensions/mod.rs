pub mod aspa;
pub mod bgp;
pub mod bgpsec;
pub mod path_end;
pub mod peer_rov;
pub mod rov;
