use std::sync::Arc;

use edgecfg::{Category, Context, Environment, ErrorKind, KvStore, MemoryStore};
use serde_json::{json, Value};

const KEYS: &[(&str, &str)] = &[
    ("/Publickeys/TestPubServer", "pub-PS"),
    ("/Publickeys/TestSubClient", "pub-SC"),
    ("/Publickeys/Visualizer", "pub-VZ"),
    ("/TestPubServer/private_key", "priv-PS"),
    ("/TestSubClient/private_key", "priv-SC"),
];

struct Fixture {
    store: Arc<MemoryStore>,
    ctx: Context,
}

fn fixture(app: &str, dev: bool, interfaces: Value, env: &[(&str, &str)]) -> Fixture {
    let store = Arc::new(MemoryStore::from_entries(KEYS.iter().copied()));
    store
        .put(&format!("/{app}/interfaces"), &interfaces.to_string())
        .unwrap();
    store.put(&format!("/{app}/config"), "{}").unwrap();

    let mut pairs = vec![("AppName", app), ("DEV_MODE", if dev { "true" } else { "false" })];
    pairs.extend_from_slice(env);

    let ctx = Context::builder()
        .with_environment(Environment::from_pairs(pairs))
        .with_store(store.clone())
        .export_global_env(false)
        .build()
        .unwrap();
    Fixture { store, ctx }
}

fn key_material_fields(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key.ends_with("_secret_key")
                    || key.ends_with("_public_key")
                    || key == "allowed_clients"
                {
                    found.push(key.clone());
                }
                key_material_fields(child, found);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| key_material_fields(v, found)),
        _ => {}
    }
}

fn every_tcp_category() -> Value {
    json!({
        "Publishers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "Topics": ["camera1_stream"], "AllowedClients": ["*"]
        }, {
            "Name": "brokered", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65014",
            "Topics": ["camera1_stream"], "BrokerAppName": "Visualizer"
        }],
        "Subscribers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65015",
            "Topics": ["camera1_stream"], "PublisherAppName": "TestSubClient"
        }, {
            "Name": "broker", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65016",
            "Topics": ["*"], "PublisherAppName": "*"
        }],
        "Servers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:66013",
            "AllowedClients": ["TestSubClient"]
        }],
        "Clients": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:66014",
            "ServerAppName": "TestSubClient"
        }]
    })
}

#[test]
fn publisher_ipc_endpoint_scenario() {
    let f = fixture(
        "TestPubServer",
        true,
        json!({ "Publishers": [{
            "Name": "default", "Type": "zmq_ipc", "EndPoint": "/EIS/sockets",
            "Topics": ["camera1_stream"]
        }] }),
        &[],
    );

    let publisher = f.ctx.publisher("default").unwrap();
    assert_eq!(publisher.endpoint().unwrap().to_string(), "/EIS/sockets");
    assert_eq!(
        publisher.msgbus_config().unwrap(),
        json!({ "type": "zmq_ipc", "socket_dir": "/EIS/sockets" })
    );
}

#[test]
fn server_wildcard_clients_scenario() {
    let f = fixture(
        "TestPubServer",
        false,
        json!({ "Servers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:66013",
            "AllowedClients": ["*"]
        }] }),
        &[],
    );

    let config = f.ctx.server("default").unwrap().msgbus_config().unwrap();
    assert_eq!(
        config,
        json!({
            "type": "zmq_tcp",
            "default": {
                "host": "127.0.0.1",
                "port": 66013,
                "server_secret_key": "priv-PS"
            },
            "allowed_clients": ["pub-PS", "pub-SC", "pub-VZ"]
        })
    );
}

#[test]
fn wildcard_allowed_clients_match_prefix_scan_on_every_call() {
    let f = fixture(
        "TestPubServer",
        false,
        json!({ "Publishers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "Topics": ["camera1_stream"], "AllowedClients": ["*"]
        }] }),
        &[],
    );
    let scan = |store: &MemoryStore| -> Vec<Value> {
        store
            .get_prefix("/Publickeys/")
            .unwrap()
            .into_iter()
            .map(|kv| Value::String(kv.value))
            .collect()
    };

    let first = f.ctx.publisher("default").unwrap().msgbus_config().unwrap();
    assert_eq!(first["allowed_clients"], Value::Array(scan(&f.store)));

    f.store.put("/Publickeys/Storage", "pub-ST").unwrap();
    let second = f.ctx.publisher("default").unwrap().msgbus_config().unwrap();
    assert_eq!(second["allowed_clients"], Value::Array(scan(&f.store)));
    assert_eq!(second["allowed_clients"].as_array().unwrap().len(), 4);
}

#[test]
fn subscriber_ipc_scenario() {
    let f = fixture(
        "TestSubClient",
        true,
        json!({ "Subscribers": [{
            "Name": "default", "Type": "zmq_ipc", "EndPoint": "/EIS/sockets",
            "PublisherAppName": "TestPubServer", "Topics": ["camera1_stream"]
        }, {
            "Name": "explicit", "Type": "zmq_ipc",
            "EndPoint": { "SocketDir": "/EIS/sockets", "SocketFile": "frames" },
            "PublisherAppName": "TestPubServer", "Topics": ["camera1_stream"]
        }] }),
        &[],
    );

    let plain = f.ctx.subscriber("default").unwrap().msgbus_config().unwrap();
    assert_eq!(
        plain,
        json!({
            "type": "zmq_ipc",
            "socket_dir": "/EIS/sockets",
            "camera1_stream": { "socket_dir": "/EIS/sockets" }
        })
    );

    let explicit = f.ctx.subscriber("explicit").unwrap().msgbus_config().unwrap();
    assert_eq!(
        explicit["camera1_stream"],
        json!({ "socket_dir": "/EIS/sockets", "socket_file": "frames" })
    );
}

#[test]
fn subscriber_wildcard_topic_collapses_to_empty_key() {
    let f = fixture(
        "TestSubClient",
        true,
        json!({ "Subscribers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "PublisherAppName": "TestPubServer", "Topics": ["*"]
        }] }),
        &[],
    );

    let config = f.ctx.subscriber("default").unwrap().msgbus_config().unwrap();
    assert_eq!(
        config,
        json!({ "type": "zmq_tcp", "": { "host": "127.0.0.1", "port": 65013 } })
    );
}

#[test]
fn dev_mode_never_attaches_key_material() {
    let f = fixture("TestPubServer", true, every_tcp_category(), &[]);

    for category in Category::ALL {
        for index in 0..f.ctx.count(category).unwrap() {
            let iface = f.ctx.interface_at(category, index).unwrap();
            let config = iface.msgbus_config().unwrap();
            let mut found = Vec::new();
            key_material_fields(&config, &mut found);
            assert!(found.is_empty(), "{category}[{index}] leaked {found:?}");
        }
    }
}

#[test]
fn builds_are_idempotent() {
    let f = fixture("TestPubServer", false, every_tcp_category(), &[]);

    for category in Category::ALL {
        for index in 0..f.ctx.count(category).unwrap() {
            let iface = f.ctx.interface_at(category, index).unwrap();
            assert_eq!(
                iface.msgbus_config().unwrap(),
                iface.msgbus_config().unwrap(),
                "{category}[{index}]"
            );
        }
    }
}

#[test]
fn publisher_named_clients_tolerate_missing_keys() {
    let f = fixture(
        "TestPubServer",
        false,
        json!({ "Publishers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "Topics": ["camera1_stream"], "AllowedClients": ["Visualizer", "Unknown"],
            "zmq_recv_hwm": 1000
        }] }),
        &[],
    );

    let config = f.ctx.publisher("default").unwrap().msgbus_config().unwrap();
    assert_eq!(
        config,
        json!({
            "type": "zmq_tcp",
            "zmq_recv_hwm": 1000,
            "zmq_tcp_publish": {
                "host": "127.0.0.1",
                "port": 65013,
                "server_secret_key": "priv-PS"
            },
            "allowed_clients": ["pub-VZ"]
        })
    );
}

#[test]
fn publisher_without_any_resolvable_client_fails() {
    let f = fixture(
        "TestPubServer",
        false,
        json!({ "Publishers": [{
            "Name": "none", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "Topics": ["a"], "AllowedClients": ["Unknown"]
        }, {
            "Name": "empty", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "Topics": ["a"], "AllowedClients": []
        }, {
            "Name": "absent", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "Topics": ["a"]
        }] }),
        &[],
    );

    for name in ["none", "empty", "absent"] {
        let err = f.ctx.publisher(name).unwrap().msgbus_config().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecurityMaterialMissing, "{name}");
    }
}

#[test]
fn clients_env_var_backs_missing_allowed_clients() {
    let f = fixture(
        "TestPubServer",
        false,
        json!({ "Publishers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "Topics": ["a"]
        }] }),
        &[("Clients", "TestSubClient,Visualizer")],
    );

    let config = f.ctx.publisher("default").unwrap().msgbus_config().unwrap();
    assert_eq!(config["allowed_clients"], json!(["pub-SC", "pub-VZ"]));
}

#[test]
fn secure_publisher_requires_own_private_key() {
    let f = fixture(
        "TestPubServer",
        false,
        json!({ "Publishers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "Topics": ["a"], "AllowedClients": ["*"]
        }] }),
        &[],
    );
    f.store.delete("/TestPubServer/private_key");

    let err = f.ctx.publisher("default").unwrap().msgbus_config().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecurityMaterialMissing);
}

#[test]
fn brokered_publisher_pairs_keys_like_a_subscriber() {
    let f = fixture("TestPubServer", false, every_tcp_category(), &[]);

    let config = f.ctx.publisher("brokered").unwrap().msgbus_config().unwrap();
    assert_eq!(
        config,
        json!({
            "type": "zmq_tcp",
            "zmq_tcp_publish": {
                "host": "127.0.0.1",
                "port": 65014,
                "brokered": true,
                "server_public_key": "pub-VZ",
                "client_public_key": "pub-PS",
                "client_secret_key": "priv-PS"
            }
        })
    );
}

#[test]
fn broker_subscriber_accepts_every_known_publisher() {
    let f = fixture("TestPubServer", false, every_tcp_category(), &[]);

    let config = f.ctx.subscriber("broker").unwrap().msgbus_config().unwrap();
    assert_eq!(
        config,
        json!({
            "type": "zmq_tcp",
            "": {
                "host": "127.0.0.1",
                "port": 65016,
                "server_secret_key": "priv-PS"
            },
            "allowed_clients": ["pub-PS", "pub-SC", "pub-VZ"]
        })
    );
}

#[test]
fn subscriber_pairs_with_named_publisher() {
    let f = fixture("TestPubServer", false, every_tcp_category(), &[]);

    let config = f.ctx.subscriber("default").unwrap().msgbus_config().unwrap();
    assert_eq!(
        config["camera1_stream"],
        json!({
            "host": "127.0.0.1",
            "port": 65015,
            "server_public_key": "pub-SC",
            "client_public_key": "pub-PS",
            "client_secret_key": "priv-PS"
        })
    );
}

#[test]
fn subscriber_tolerates_missing_publisher_key_but_not_own_keys() {
    let f = fixture(
        "TestSubClient",
        false,
        json!({ "Subscribers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "PublisherAppName": "Unknown", "Topics": ["camera1_stream"]
        }] }),
        &[],
    );

    let config = f.ctx.subscriber("default").unwrap().msgbus_config().unwrap();
    let entry = config["camera1_stream"].as_object().unwrap();
    assert!(!entry.contains_key("server_public_key"));
    assert_eq!(entry["client_public_key"], "pub-SC");
    assert_eq!(entry["client_secret_key"], "priv-SC");

    f.store.delete("/Publickeys/TestSubClient");
    let err = f.ctx.subscriber("default").unwrap().msgbus_config().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecurityMaterialMissing);
}

#[test]
fn prod_subscriber_requires_publisher_app_name() {
    let f = fixture(
        "TestSubClient",
        false,
        json!({ "Subscribers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "Topics": ["camera1_stream"]
        }] }),
        &[],
    );

    let err = f.ctx.subscriber("default").unwrap().msgbus_config().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[test]
fn tcp_subscriber_without_topics_fails() {
    let mut f = fixture(
        "TestSubClient",
        true,
        json!({ "Subscribers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "Topics": ["camera1_stream"]
        }] }),
        &[],
    );
    let target = f.ctx.subscriber("default").unwrap().to_ref().unwrap();
    f.ctx.set_topics::<&str>(&target, &[]).unwrap();

    let err = f.ctx.resolve(&target).unwrap().msgbus_config().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[test]
fn tcp_publisher_without_topics_fails() {
    for dev in [true, false] {
        let f = fixture(
            "TestPubServer",
            dev,
            json!({ "Publishers": [{
                "Name": "direct", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
                "Topics": [], "AllowedClients": ["*"]
            }, {
                "Name": "brokered", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65014",
                "Topics": [], "BrokerAppName": "Visualizer"
            }] }),
            &[],
        );

        for name in ["direct", "brokered"] {
            let err = f.ctx.publisher(name).unwrap().msgbus_config().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Malformed, "{name} dev={dev}");
        }
    }
}

#[test]
fn padded_type_is_unsupported() {
    let f = fixture(
        "TestPubServer",
        true,
        json!({ "Servers": [{
            "Name": "default", "Type": " zmq_tcp ", "EndPoint": "127.0.0.1:66013"
        }] }),
        &[],
    );

    let err = f.ctx.server("default").unwrap().msgbus_config().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn server_and_client_key_objects_by_name() {
    let f = fixture("TestPubServer", false, every_tcp_category(), &[]);

    let server = f.ctx.server("default").unwrap().msgbus_config().unwrap();
    assert_eq!(server["allowed_clients"], json!(["pub-SC"]));
    assert_eq!(server["default"]["server_secret_key"], "priv-PS");

    let client = f.ctx.client("default").unwrap().msgbus_config().unwrap();
    assert_eq!(
        client,
        json!({
            "type": "zmq_tcp",
            "default": {
                "host": "127.0.0.1",
                "port": 66014,
                "server_public_key": "pub-SC",
                "client_public_key": "pub-PS",
                "client_secret_key": "priv-PS"
            }
        })
    );
}

#[test]
fn ipc_server_and_client_key_socket_by_name() {
    let f = fixture(
        "TestPubServer",
        false,
        json!({
            "Servers": [{ "Name": "echo", "Type": "zmq_ipc", "EndPoint": "/EIS/sockets,echo_sock" }],
            "Clients": [{ "Name": "echo", "Type": "zmq_ipc", "EndPoint": "/EIS/sockets" }]
        }),
        &[],
    );

    assert_eq!(
        f.ctx.server("echo").unwrap().msgbus_config().unwrap(),
        json!({
            "type": "zmq_ipc",
            "socket_dir": "/EIS/sockets",
            "echo": { "socket_dir": "/EIS/sockets", "socket_file": "echo_sock" }
        })
    );
    assert_eq!(
        f.ctx.client("echo").unwrap().msgbus_config().unwrap(),
        json!({
            "type": "zmq_ipc",
            "socket_dir": "/EIS/sockets",
            "echo": { "socket_dir": "/EIS/sockets" }
        })
    );
}

#[test]
fn ipc_publisher_wildcard_needs_socket_file() {
    let f = fixture(
        "TestPubServer",
        true,
        json!({ "Publishers": [{
            "Name": "bare", "Type": "zmq_ipc", "EndPoint": "/EIS/sockets", "Topics": ["*"]
        }, {
            "Name": "file", "Type": "zmq_ipc",
            "EndPoint": { "SocketDir": "/EIS/sockets", "SocketFile": "all" }, "Topics": ["*"]
        }] }),
        &[],
    );

    let err = f.ctx.publisher("bare").unwrap().msgbus_config().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);

    let config = f.ctx.publisher("file").unwrap().msgbus_config().unwrap();
    assert_eq!(
        config[""],
        json!({ "socket_dir": "/EIS/sockets", "socket_file": "all" })
    );
}

#[test]
fn unsupported_type_can_be_fixed_by_override() {
    let descriptor = json!({ "Publishers": [{
        "Name": "default", "Type": "zmq_udp", "EndPoint": "127.0.0.1:65013", "Topics": ["a"]
    }] });

    let f = fixture("TestPubServer", true, descriptor.clone(), &[]);
    let err = f.ctx.publisher("default").unwrap().msgbus_config().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    let f = fixture(
        "TestPubServer",
        true,
        descriptor,
        &[("PUBLISHER_TYPE", "zmq_ipc"), ("PUBLISHER_ENDPOINT", "/tmp/sockets")],
    );
    let config = f.ctx.publisher("default").unwrap().msgbus_config().unwrap();
    assert_eq!(config, json!({ "type": "zmq_ipc", "socket_dir": "/tmp/sockets" }));
}

#[test]
fn per_name_endpoint_override_beats_category_override() {
    let f = fixture(
        "TestPubServer",
        true,
        json!({ "Servers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:66013"
        }] }),
        &[
            ("SERVER_ENDPOINT", "0.0.0.0:1000"),
            ("SERVER_default_ENDPOINT", "10.0.0.5:2000"),
        ],
    );

    let config = f.ctx.server("default").unwrap().msgbus_config().unwrap();
    assert_eq!(config["default"], json!({ "host": "10.0.0.5", "port": 2000 }));
}

#[test]
fn recv_hwm_must_be_an_integer() {
    let f = fixture(
        "TestPubServer",
        true,
        json!({ "Clients": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:66013",
            "zmq_recv_hwm": "1000"
        }] }),
        &[],
    );

    let err = f.ctx.client("default").unwrap().msgbus_config().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[test]
fn topic_mutation_feeds_later_builds() {
    let mut f = fixture(
        "TestSubClient",
        true,
        json!({ "Subscribers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "Topics": ["camera1_stream"]
        }] }),
        &[],
    );
    let target = f.ctx.subscriber("default").unwrap().to_ref().unwrap();
    f.ctx.set_topics(&target, &["left", "right"]).unwrap();

    let iface = f.ctx.resolve(&target).unwrap();
    assert_eq!(iface.topics().unwrap(), vec!["left", "right"]);

    let config = iface.msgbus_config().unwrap();
    assert!(config.get("camera1_stream").is_none());
    assert_eq!(config["left"]["port"], 65013);
    assert_eq!(config["right"]["host"], "127.0.0.1");
}

#[test]
fn reserved_topic_names_are_rejected() {
    let f = fixture(
        "TestSubClient",
        true,
        json!({ "Subscribers": [{
            "Name": "default", "Type": "zmq_tcp", "EndPoint": "127.0.0.1:65013",
            "Topics": ["type"]
        }] }),
        &[],
    );

    let err = f.ctx.subscriber("default").unwrap().msgbus_config().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}
