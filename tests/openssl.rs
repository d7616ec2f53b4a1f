mod util;

use openssl::nid::Nid;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509, X509StoreContext};

use certtree::store::CertificateStore;

fn x509(pem: &str) -> X509 {
    X509::from_pem(pem.as_bytes()).expect("Failed to parse PEM")
}

#[test]
fn test_openssl_verifies_issued_chain() {
    let service = util::issue_hierarchy();

    let root = service.store().load("ca").unwrap().unwrap();
    let leaf = service.store().load("client1").unwrap().unwrap();
    let chain = service.assemble_chain("client1").unwrap();

    // Trust only the root; the sub-CA travels as an untrusted intermediate
    let mut trust = X509StoreBuilder::new().unwrap();
    trust.add_cert(x509(&root.pem_cert)).unwrap();
    let trust = trust.build();

    let mut untrusted = Stack::new().unwrap();
    for pem in &chain[..chain.len() - 1] {
        untrusted.push(x509(pem)).unwrap();
    }

    let leaf = x509(&leaf.pem_cert);
    let mut ctx = X509StoreContext::new().unwrap();
    let verified = ctx
        .init(&trust, &leaf, &untrusted, |c| {
            let ok = c.verify_cert()?;
            assert_eq!(c.error().as_raw(), 0, "{}", c.error().error_string());
            Ok(ok)
        })
        .unwrap();
    assert!(verified, "OpenSSL rejected the issued chain");
}

#[test]
fn test_openssl_server_chain_directly_under_root() {
    let service = util::issue_hierarchy();
    let root = service.store().load("ca").unwrap().unwrap();
    let server = service.store().load("small-ubuntu-20-04").unwrap().unwrap();

    let mut trust = X509StoreBuilder::new().unwrap();
    trust.add_cert(x509(&root.pem_cert)).unwrap();
    let trust = trust.build();

    let untrusted = Stack::new().unwrap();
    let server = x509(&server.pem_cert);
    let mut ctx = X509StoreContext::new().unwrap();
    assert!(
        ctx.init(&trust, &server, &untrusted, |c| c.verify_cert())
            .unwrap()
    );
}

#[test]
fn test_openssl_reads_key_identifiers_and_names() {
    let service = util::issue_hierarchy();
    let subca = x509(&service.store().load("subca1").unwrap().unwrap().pem_cert);
    let client = x509(&service.store().load("client1").unwrap().unwrap().pem_cert);

    let ski = subca.subject_key_id().expect("sub-CA has no SKI");
    let aki = client.authority_key_id().expect("client has no AKI");
    assert_eq!(aki.as_slice(), ski.as_slice());

    // Our own decoding agrees with OpenSSL's
    let ours = util::load_cert(&service, "client1");
    assert_eq!(
        ours.authority_key_identifier().unwrap().unwrap().key_identifier,
        aki.as_slice()
    );

    let cn = |name: &openssl::x509::X509NameRef| {
        name.entries_by_nid(Nid::COMMONNAME)
            .next()
            .unwrap()
            .data()
            .as_utf8()
            .unwrap()
            .to_string()
    };
    assert_eq!(cn(client.subject_name()), "client1");
    assert_eq!(cn(client.issuer_name()), "subca1");
    assert_eq!(client.subject_name().entries().count(), 1);

    assert_eq!(client.version(), 2, "X509 version should be 3 (0-based index)");
    assert_eq!(
        client.signature_algorithm().object().nid(),
        Nid::SHA256WITHRSAENCRYPTION
    );

    // Our fingerprint is OpenSSL's SHA-1 digest
    let digest = client
        .digest(openssl::hash::MessageDigest::sha1())
        .unwrap();
    assert_eq!(
        hex::encode(&*digest),
        service.store().load("client1").unwrap().unwrap().fingerprint
    );
}

#[cfg(feature = "pkcs12")]
#[test]
fn test_openssl_parses_exported_pkcs12() {
    use openssl::pkcs12::Pkcs12;

    let service = util::issue_hierarchy();
    let record = service.store().load("client1").unwrap().unwrap();

    let der = service.export_pkcs12("client1", None).unwrap();
    let parsed = Pkcs12::from_der(&der).unwrap().parse2("client1").unwrap();

    assert_eq!(
        parsed.cert.unwrap().to_pem().unwrap(),
        record.pem_cert.as_bytes()
    );
    let key = parsed.pkey.unwrap();
    assert_eq!(key.bits(), 2048);
    assert!(key.rsa().is_ok());

    let der = service.export_pkcs12("client1", Some("s3cret")).unwrap();
    assert!(Pkcs12::from_der(&der).unwrap().parse2("s3cret").is_ok());
}
