// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

//! Call shapes of the home-chain resolver that the gateway answers for.

use alloy_sol_types::sol;

sol! {
    /// Functions answered with a storage proof
    interface IRemoteResolver {
        function text(bytes context, bytes32 node, string key) external view returns (string);
        function addr(bytes context, bytes32 node) external view returns (address);
        function addr(bytes context, bytes32 node, uint256 coin_type) external view returns (bytes);
        function ABI(bytes context, bytes32 node, uint256 content_types) external view returns (uint256, bytes);
        function contenthash(bytes context, bytes32 node) external view returns (bytes);
        function name(bytes context, bytes32 node) external view returns (string);
        function pubkey(bytes context, bytes32 node) external view returns (bytes32 x, bytes32 y);
        function dnsRecord(bytes context, bytes32 node, bytes32 name, uint16 resource) external view returns (bytes);
        function hasDNSRecords(bytes context, bytes32 node, bytes32 name) external view returns (bool);
        function zonehash(bytes context, bytes32 node) external view returns (bytes);
        function interfaceImplementer(bytes context, bytes32 node, bytes4 interface_id) external view returns (address);
    }

    /// Context-less address lookup of the flat legacy mapping
    interface ILegacyResolver {
        function addr(bytes32 node) external view returns (address);
    }

    /// Resolver functions the gateway knows about but does not serve
    interface IUnservedResolver {
        function resolve(bytes name, bytes data) external view returns (bytes);
        function supportsInterface(bytes4 interface_id) external view returns (bool);
        function multicall(bytes[] data) external returns (bytes[] results);
        function setText(bytes32 node, string key, string value) external;
        function setAddr(bytes32 node, address a) external;
        function setAddr(bytes32 node, uint256 coin_type, bytes a) external;
    }
}
