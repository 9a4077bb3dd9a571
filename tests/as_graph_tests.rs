use std::fs;
use std::io::{Cursor, Write};

use bzip2::write::BzEncoder;
use bzip2::Compression;

use bgpattacksim::as_graphs::as_graph::{ASBuilder, ASGraph, CustomerProviderLink, PeerLink};
use bgpattacksim::as_graphs::as_graph_generators::caida::parse_links;
use bgpattacksim::as_graphs::as_graph_generators::{
    ASGraphGenerator, CAIDAASGraphGenerator, CAIDA_CACHE_FILE_NAME,
};
use bgpattacksim::run_context::RunContext;
use bgpattacksim::shared::{ASNGroups, Relationships, SimulationError};

/// 1 and 2 are peered tier-1s; 1 serves 3, 4 and 5; 4 serves 6; 5 serves 7
fn create_test_as_graph() -> ASGraph {
    ASGraph::build(vec![
        ASBuilder::new(1)
            .as_input_clique()
            .with_peers(vec![2])
            .with_customers(vec![3, 4, 5]),
        ASBuilder::new(2).as_input_clique().with_peers(vec![1]),
        ASBuilder::new(3).with_providers(vec![1]),
        ASBuilder::new(4).with_providers(vec![1]).with_customers(vec![6]),
        ASBuilder::new(5).with_providers(vec![1]).with_customers(vec![7]),
        ASBuilder::new(6).with_providers(vec![4]),
        ASBuilder::new(7).with_providers(vec![5]),
    ])
    .unwrap()
}

#[test]
fn test_as_creation() {
    let as_graph = create_test_as_graph();
    let as1 = as_graph.get(&1).unwrap();

    assert_eq!(as1.asn, 1);
    assert_eq!(as1.peers, vec![2]);
    assert_eq!(as1.customers, vec![3, 4, 5]);
    assert!(as1.providers.is_empty());
    assert!(as1.input_clique);
    assert_eq!(as_graph.len(), 7);
    assert!(as_graph.get(&99).is_none());
}

#[test]
fn test_as_neighbors() {
    let as_graph = create_test_as_graph();
    let as4 = as_graph.get(&4).unwrap();

    assert_eq!(as4.relationship_to(1), Some(Relationships::Providers));
    assert_eq!(as4.relationship_to(6), Some(Relationships::Customers));
    assert_eq!(as4.relationship_to(5), None);
    assert!(as4.is_neighbor(6));
    let mut neighbors: Vec<u32> = as4.neighbors().collect();
    neighbors.sort();
    assert_eq!(neighbors, vec![1, 6]);
    assert_eq!(
        as_graph.get(&1).unwrap().relationship_to(2),
        Some(Relationships::Peers)
    );
}

#[test]
fn test_propagation_rank_assignment() {
    let as_graph = create_test_as_graph();
    let rank = |asn| as_graph.get(&asn).unwrap().propagation_rank;

    // Leaves first, and every provider above all of its customers
    assert_eq!(rank(3), 0);
    assert_eq!(rank(6), 0);
    assert_eq!(rank(7), 0);
    assert_eq!(rank(2), 0);
    assert_eq!(rank(4), 1);
    assert_eq!(rank(5), 1);
    assert_eq!(rank(1), 2);
    assert_eq!(as_graph.propagation_ranks.len(), 3);

    for as_obj in as_graph.iter() {
        for customer in &as_obj.customers {
            assert!(as_obj.propagation_rank > rank(*customer));
        }
    }
}

#[test]
fn test_stub_and_multihomed_flags() {
    let as_graph = ASGraph::build(vec![
        ASBuilder::new(1).with_customers(vec![3, 4]).with_peers(vec![2]),
        ASBuilder::new(2).with_customers(vec![4]).with_peers(vec![1]),
        ASBuilder::new(3).with_providers(vec![1]),
        ASBuilder::new(4).with_providers(vec![1, 2]),
    ])
    .unwrap();

    let as3 = as_graph.get(&3).unwrap();
    assert!(as3.stub);
    assert!(!as3.multihomed);
    let as4 = as_graph.get(&4).unwrap();
    assert!(!as4.stub);
    assert!(as4.multihomed);
    assert!(!as_graph.get(&1).unwrap().is_stub_or_mh());
}

#[test]
fn test_subgraphs_partition_the_graph() {
    let as_graph = create_test_as_graph();

    let clique: Vec<u32> = as_graph.asn_group(ASNGroups::InputClique).iter().copied().collect();
    let stubs: Vec<u32> = as_graph.asn_group(ASNGroups::StubsOrMh).iter().copied().collect();
    let etc: Vec<u32> = as_graph.asn_group(ASNGroups::Etc).iter().copied().collect();
    assert_eq!(clique, vec![1, 2]);
    assert_eq!(stubs, vec![3, 6, 7]);
    assert_eq!(etc, vec![4, 5]);
    assert!(as_graph.validate_subgraphs().is_ok());
}

#[test]
fn test_cycle_detection() {
    let result = ASGraph::build(vec![
        ASBuilder::new(1).with_providers(vec![3]).with_customers(vec![2]),
        ASBuilder::new(2).with_providers(vec![1]).with_customers(vec![3]),
        ASBuilder::new(3).with_providers(vec![2]).with_customers(vec![1]),
    ]);
    assert!(matches!(result, Err(SimulationError::Cycle(_))));
}

#[test]
fn test_no_cycle() {
    let result = ASGraph::build(vec![
        ASBuilder::new(1).with_customers(vec![2, 3]),
        ASBuilder::new(2).with_providers(vec![1]).with_customers(vec![3]),
        ASBuilder::new(3).with_providers(vec![1, 2]),
    ]);
    assert!(result.is_ok());
}

#[test]
fn test_asymmetric_relationship_rejected() {
    let result = ASGraph::build(vec![
        ASBuilder::new(1).with_customers(vec![2]),
        ASBuilder::new(2),
    ]);
    assert!(matches!(
        result,
        Err(SimulationError::AsymmetricRelationship { asn: 1, neighbor: 2, .. })
    ));
}

#[test]
fn test_self_link_and_unknown_neighbor_rejected() {
    let self_link = ASGraph::build(vec![ASBuilder::new(1).with_peers(vec![1])]);
    assert!(matches!(self_link, Err(SimulationError::SelfLink(1))));

    let unknown = ASGraph::build(vec![ASBuilder::new(1).with_providers(vec![9])]);
    assert!(matches!(unknown, Err(SimulationError::UnknownAsn(9))));
}

#[test]
fn test_from_links_matches_builders() {
    let from_links = ASGraph::from_links(
        &[
            CustomerProviderLink::new(1, 3),
            CustomerProviderLink::new(1, 4),
            CustomerProviderLink::new(1, 5),
            CustomerProviderLink::new(4, 6),
            CustomerProviderLink::new(5, 7),
        ],
        &[PeerLink::new(1, 2)],
        &[1, 2],
    )
    .unwrap();
    let built = create_test_as_graph();

    assert_eq!(from_links.len(), built.len());
    for as_obj in built.iter() {
        let other = from_links.get(&as_obj.asn).unwrap();
        assert_eq!(other.peers, as_obj.peers);
        assert_eq!(other.providers, as_obj.providers);
        assert_eq!(other.customers, as_obj.customers);
        assert_eq!(other.propagation_rank, as_obj.propagation_rank);
        assert_eq!(other.subgraph(), as_obj.subgraph());
    }
}

const CAIDA_SAMPLE: &str = "\
# source:topology|BGP|20240101|
# input clique: 1 2
1|2|0|bgp
1|3|-1|bgp
1|4|-1|bgp
4|5|-1|mlp
2|5|-1|bgp
";

#[test]
fn test_caida_parse_links() {
    let links = parse_links(Cursor::new(CAIDA_SAMPLE)).unwrap();

    assert_eq!(links.input_clique, vec![1, 2]);
    assert_eq!(links.peer_links, vec![PeerLink::new(1, 2)]);
    assert_eq!(links.cp_links.len(), 4);
    assert!(links.cp_links.contains(&CustomerProviderLink::new(4, 5)));
}

#[test]
fn test_caida_malformed_line() {
    let result = parse_links(Cursor::new("1|2|0\nnot a link\n"));
    assert!(matches!(
        result,
        Err(SimulationError::MalformedTopology { line: 2, .. })
    ));
}

#[test]
fn test_caida_generator_reads_plain_file() {
    let path = std::env::temp_dir().join(format!("bgpattacksim-caida-{}.txt", std::process::id()));
    fs::write(&path, CAIDA_SAMPLE).unwrap();

    let as_graph = CAIDAASGraphGenerator::new(&path).generate().unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(as_graph.len(), 5);
    assert!(as_graph.get(&5).unwrap().multihomed);
    assert_eq!(as_graph.get(&1).unwrap().subgraph(), ASNGroups::InputClique);
}

#[test]
fn test_caida_generator_reads_cached_bz2_file() {
    let cache_dir = std::env::temp_dir().join(format!("bgpattacksim-cache-{}", std::process::id()));
    fs::create_dir_all(&cache_dir).unwrap();
    let mut encoder = BzEncoder::new(
        fs::File::create(cache_dir.join(CAIDA_CACHE_FILE_NAME)).unwrap(),
        Compression::default(),
    );
    encoder.write_all(CAIDA_SAMPLE.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let run_context = RunContext::default().with_cache_dir(&cache_dir);
    let generator = CAIDAASGraphGenerator::from_run_context(&run_context);
    assert_eq!(generator.path, cache_dir.join(CAIDA_CACHE_FILE_NAME));
    let as_graph = generator.generate().unwrap();
    fs::remove_dir_all(&cache_dir).unwrap();

    assert_eq!(as_graph.len(), 5);
    assert_eq!(as_graph.asn_group(ASNGroups::InputClique).len(), 2);
}
