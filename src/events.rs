use alloy_sol_types::sol;

// Declare events emitted by the sale once an operation has gone through
sol! {
    event Whitelisted(address indexed account);
    event PresaleCommitted(address indexed buyer, uint256 amount, uint256 allowance);
    event TokensPurchased(address indexed buyer, uint256 value, uint256 amount, uint8 stage);
    event TokensGiven(address indexed buyer, uint256 value, uint256 amount, uint8 stage);
    event Finalized(bool goal_reached, uint256 raised);
    event Refunded(address indexed buyer, uint256 amount);
}
