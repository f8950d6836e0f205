pub mod commit_graph;
