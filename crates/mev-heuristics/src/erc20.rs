//! ERC20 ABI bindings.

use alloy::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function symbol() external view returns (string symbol);
        function decimals() external view returns (uint8 decimals);
    }
}
