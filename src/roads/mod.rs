pub mod connector;
pub mod road_network;
pub mod road_prune;
