use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IBep20 {
        function symbol() external view returns (string);
    }
}
