#![allow(dead_code)]

use certtree::cert::Certificate;
use certtree::role::Role;
use certtree::service::IssuanceService;
use certtree::store::MemoryStore;

/// Issues the `ca -> subca1 -> client1` hierarchy, plus `subca2` and a server
/// directly under the root.
pub fn issue_hierarchy() -> IssuanceService<MemoryStore> {
    let service = IssuanceService::new(MemoryStore::new());
    service.issue("ca", Role::Root, None).unwrap();
    service.issue("subca1", Role::SubCa, Some("ca")).unwrap();
    service.issue("subca2", Role::SubCa, Some("ca")).unwrap();
    service
        .issue("client1", Role::Client, Some("subca1"))
        .unwrap();
    service
        .issue("small-ubuntu-20-04", Role::Server, Some("ca"))
        .unwrap();
    service
}

pub fn load_cert(service: &IssuanceService<MemoryStore>, subject: &str) -> Certificate {
    service.load_certificate(subject).unwrap()
}
